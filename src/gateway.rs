//! Cached access to the explorer and the node.
//!
//! Every query kind has its own [`QueryCache`] with the freshness window
//! configured in [`GatewayConfig`].

use std::time::Duration;

use alloy::{eips::BlockNumberOrTag, primitives::{Address, U256}};

use crate::{
    Network,
    cache::{CacheConfig, QueryCache},
    error::ClientError,
    explorer::ExplorerClient,
    market::MarketSource,
    portfolio::PortfolioSource,
    rpc::ChainRpc,
    types::{
        AddressInfo, BlocksResponse, CoinPriceResponse, NetworkStats, NetworkStatus, PageQuery,
        TokenHoldersResponse, TokenInfo, TokenQuery, TokenTransfersResponse, TokensResponse,
        TransactionQuery, TransactionsResponse,
    },
};

/// Freshness window per query kind.
#[derive(Clone, Copy, Debug)]
pub struct GatewayConfig {
    pub address_info: Duration,
    pub address_tokens: Duration,
    pub address_transactions: Duration,
    pub address_token_transfers: Duration,
    pub token_info: Duration,
    pub token_holders: Duration,
    pub token_transfers: Duration,
    pub network_stats: Duration,
    pub blocks: Duration,
    pub coin_price: Duration,
    pub balance: Duration,
    pub gas_price: Duration,
    pub network_status: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        const SECOND: Duration = Duration::from_secs(1);
        const MINUTE: Duration = Duration::from_secs(60);
        Self {
            address_info: SECOND * 10,
            address_tokens: MINUTE * 5,
            address_transactions: MINUTE,
            address_token_transfers: MINUTE * 5,
            token_info: MINUTE * 10,
            token_holders: MINUTE * 10,
            token_transfers: MINUTE * 5,
            network_stats: MINUTE,
            blocks: SECOND * 30,
            coin_price: SECOND * 30,
            balance: SECOND * 10,
            gas_price: SECOND * 5,
            network_status: SECOND * 5,
        }
    }
}

#[derive(Debug)]
struct Caches {
    address_info: QueryCache<Address, AddressInfo>,
    address_tokens: QueryCache<Address, TokensResponse>,
    address_transactions: QueryCache<Address, TransactionsResponse>,
    address_token_transfers: QueryCache<Address, TokenTransfersResponse>,
    token_info: QueryCache<Address, TokenInfo>,
    token_holders: QueryCache<Address, TokenHoldersResponse>,
    token_transfers: QueryCache<Address, TokenTransfersResponse>,
    network_stats: QueryCache<(), NetworkStats>,
    blocks: QueryCache<(), BlocksResponse>,
    coin_price: QueryCache<(), CoinPriceResponse>,
    balance: QueryCache<Address, U256>,
    gas_price: QueryCache<(), U256>,
    network_status: QueryCache<(), NetworkStatus>,
}

impl Caches {
    fn new(config: &GatewayConfig) -> Self {
        let ttl = CacheConfig::new;
        Self {
            address_info: QueryCache::new("address_info", ttl(config.address_info)),
            address_tokens: QueryCache::new("address_tokens", ttl(config.address_tokens)),
            address_transactions: QueryCache::new(
                "address_transactions",
                ttl(config.address_transactions),
            ),
            address_token_transfers: QueryCache::new(
                "address_token_transfers",
                ttl(config.address_token_transfers),
            ),
            token_info: QueryCache::new("token_info", ttl(config.token_info)),
            token_holders: QueryCache::new("token_holders", ttl(config.token_holders)),
            token_transfers: QueryCache::new("token_transfers", ttl(config.token_transfers)),
            network_stats: QueryCache::new("network_stats", ttl(config.network_stats)),
            blocks: QueryCache::new("blocks", ttl(config.blocks)),
            coin_price: QueryCache::new("coin_price", ttl(config.coin_price)),
            balance: QueryCache::new("balance", ttl(config.balance)),
            gas_price: QueryCache::new("gas_price", ttl(config.gas_price)),
            network_status: QueryCache::new("network_status", ttl(config.network_status)),
        }
    }
}

/// Explorer and node clients behind per-query caches.
#[derive(Debug)]
pub struct Gateway {
    network: Network,
    explorer: ExplorerClient,
    rpc: ChainRpc,
    caches: Caches,
}

impl Gateway {
    pub fn new(network: Network, explorer: ExplorerClient, rpc: ChainRpc, config: GatewayConfig) -> Self {
        Self {
            network,
            explorer,
            rpc,
            caches: Caches::new(&config),
        }
    }

    /// Gateway over HTTP clients of `network` with default freshness.
    pub fn for_network(network: Network) -> Result<Self, ClientError> {
        let explorer = ExplorerClient::for_network(&network)?;
        let rpc = ChainRpc::for_network(&network);
        Ok(Self::new(network, explorer, rpc, GatewayConfig::default()))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn explorer(&self) -> &ExplorerClient {
        &self.explorer
    }

    pub fn rpc(&self) -> &ChainRpc {
        &self.rpc
    }

    pub async fn address_info(&self, address: Address) -> Result<AddressInfo, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .address_info
            .get_or_fetch(address, move || async move { explorer.address_info(address).await })
            .await
    }

    pub async fn address_tokens(&self, address: Address) -> Result<TokensResponse, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .address_tokens
            .get_or_fetch(address, move || async move {
                explorer.address_tokens(address, &TokenQuery::default()).await
            })
            .await
    }

    pub async fn address_transactions(
        &self,
        address: Address,
    ) -> Result<TransactionsResponse, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .address_transactions
            .get_or_fetch(address, move || async move {
                explorer
                    .address_transactions(address, &TransactionQuery::default())
                    .await
            })
            .await
    }

    pub async fn address_token_transfers(
        &self,
        address: Address,
    ) -> Result<TokenTransfersResponse, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .address_token_transfers
            .get_or_fetch(address, move || async move {
                explorer.address_token_transfers(address).await
            })
            .await
    }

    pub async fn token_info(&self, token: Address) -> Result<TokenInfo, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .token_info
            .get_or_fetch(token, move || async move { explorer.token_info(token).await })
            .await
    }

    pub async fn token_holders(&self, token: Address) -> Result<TokenHoldersResponse, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .token_holders
            .get_or_fetch(token, move || async move {
                explorer.token_holders(token, &PageQuery::default()).await
            })
            .await
    }

    pub async fn token_transfers(&self, token: Address) -> Result<TokenTransfersResponse, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .token_transfers
            .get_or_fetch(token, move || async move {
                explorer.token_transfers(token, &PageQuery::default()).await
            })
            .await
    }

    pub async fn network_stats(&self) -> Result<NetworkStats, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .network_stats
            .get_or_fetch((), move || async move { explorer.network_stats().await })
            .await
    }

    pub async fn blocks(&self) -> Result<BlocksResponse, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .blocks
            .get_or_fetch((), move || async move { explorer.blocks(None).await })
            .await
    }

    pub async fn coin_price(&self) -> Result<CoinPriceResponse, ClientError> {
        let explorer = self.explorer.clone();
        self.caches
            .coin_price
            .get_or_fetch((), move || async move { explorer.coin_price().await })
            .await
    }

    pub async fn balance(&self, address: Address) -> Result<U256, ClientError> {
        let rpc = self.rpc.clone();
        self.caches
            .balance
            .get_or_fetch(address, move || async move {
                rpc.get_balance(address, BlockNumberOrTag::Latest).await
            })
            .await
    }

    pub async fn gas_price(&self) -> Result<U256, ClientError> {
        let rpc = self.rpc.clone();
        self.caches
            .gas_price
            .get_or_fetch((), move || async move { rpc.gas_price().await })
            .await
    }

    pub async fn network_status(&self) -> Result<NetworkStatus, ClientError> {
        let rpc = self.rpc.clone();
        self.caches
            .network_status
            .get_or_fetch((), move || async move { rpc.network_status().await })
            .await
    }

    /// Drops every cached entry of `address`, e.g. after sending a transaction.
    pub fn invalidate_address(&self, address: &Address) {
        self.caches.address_info.invalidate(address);
        self.caches.address_tokens.invalidate(address);
        self.caches.address_transactions.invalidate(address);
        self.caches.address_token_transfers.invalidate(address);
        self.caches.balance.invalidate(address);
    }
}

impl PortfolioSource for Gateway {
    async fn native_balance(&self, address: Address) -> Result<U256, ClientError> {
        self.balance(address).await
    }

    async fn address_tokens(&self, address: Address) -> Result<TokensResponse, ClientError> {
        Gateway::address_tokens(self, address).await
    }

    async fn address_transactions(&self, address: Address) -> Result<TransactionsResponse, ClientError> {
        Gateway::address_transactions(self, address).await
    }

    async fn coin_price(&self) -> Result<CoinPriceResponse, ClientError> {
        Gateway::coin_price(self).await
    }
}

impl MarketSource for Gateway {
    async fn network_stats(&self) -> Result<NetworkStats, ClientError> {
        Gateway::network_stats(self).await
    }

    async fn coin_price(&self) -> Result<CoinPriceResponse, ClientError> {
        Gateway::coin_price(self).await
    }

    async fn network_status(&self) -> Result<NetworkStatus, ClientError> {
        Gateway::network_status(self).await
    }

    async fn blocks(&self) -> Result<BlocksResponse, ClientError> {
        Gateway::blocks(self).await
    }
}

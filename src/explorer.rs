//! Client of the Quaiscan block explorer API.
//!
//! Covers the `v2` REST endpoints plus the legacy `?module=stats` queries.
//! Endpoints are appended verbatim to the base URL, so a base of
//! `https://quaiscan.io/api` resolves `/v2/stats` to
//! `https://quaiscan.io/api/v2/stats`.

use std::time::Duration;

use alloy::primitives::Address;
use reqwest::header::ACCEPT;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::{
    Network,
    error::ClientError,
    types::{
        AddressInfo, BlocksResponse, CoinPriceResponse, NetworkStats, PageQuery,
        TokenHoldersResponse, TokenInfo, TokenQuery, TokenSupplyResponse,
        TokenTransfersResponse, TokensResponse, TransactionQuery, TransactionsResponse,
    },
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExplorerClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn for_network(network: &Network) -> Result<Self, ClientError> {
        Self::new(network.explorer_url().clone(), DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn address_info(&self, address: Address) -> Result<AddressInfo, ClientError> {
        let endpoint = format!("/v2/addresses/{address}");
        match self.get(&endpoint, None::<&()>).await {
            Err(err) if err.is_not_found() => {
                debug!(%address, "address unknown to explorer");
                Ok(AddressInfo::empty(address.to_string()))
            }
            other => other,
        }
    }

    pub async fn address_tokens(
        &self,
        address: Address,
        query: &TokenQuery,
    ) -> Result<TokensResponse, ClientError> {
        let endpoint = format!("/v2/addresses/{address}/tokens");
        empty_if_not_found(self.get(&endpoint, Some(query)).await)
    }

    pub async fn address_transactions(
        &self,
        address: Address,
        query: &TransactionQuery,
    ) -> Result<TransactionsResponse, ClientError> {
        let endpoint = format!("/v2/addresses/{address}/transactions");
        empty_if_not_found(self.get(&endpoint, Some(query)).await)
    }

    pub async fn address_token_transfers(
        &self,
        address: Address,
    ) -> Result<TokenTransfersResponse, ClientError> {
        let endpoint = format!("/v2/addresses/{address}/token-transfers");
        empty_if_not_found(self.get(&endpoint, None::<&()>).await)
    }

    pub async fn token_info(&self, token: Address) -> Result<TokenInfo, ClientError> {
        self.get(&format!("/v2/tokens/{token}"), None::<&()>).await
    }

    pub async fn token_holders(
        &self,
        token: Address,
        query: &PageQuery,
    ) -> Result<TokenHoldersResponse, ClientError> {
        let endpoint = format!("/v2/tokens/{token}/holders");
        self.get(&endpoint, non_empty(query)).await
    }

    pub async fn token_transfers(
        &self,
        token: Address,
        query: &PageQuery,
    ) -> Result<TokenTransfersResponse, ClientError> {
        let endpoint = format!("/v2/tokens/{token}/transfers");
        self.get(&endpoint, non_empty(query)).await
    }

    pub async fn network_stats(&self) -> Result<NetworkStats, ClientError> {
        self.get("/v2/stats", None::<&()>).await
    }

    /// Latest blocks, or the blocks preceding `block_number`.
    pub async fn blocks(&self, block_number: Option<u64>) -> Result<BlocksResponse, ClientError> {
        let query = block_number.map(|n| PageQuery::default().param("block_number", n.to_string()));
        self.get("/v2/blocks", query.as_ref()).await
    }

    pub async fn coin_price(&self) -> Result<CoinPriceResponse, ClientError> {
        self.get("?module=stats&action=coinprice", None::<&()>).await
    }

    pub async fn token_supply(&self, contract: Address) -> Result<TokenSupplyResponse, ClientError> {
        let endpoint = format!("?module=stats&action=tokensupply&contractaddress={contract}");
        self.get(&endpoint, None::<&()>).await
    }

    /// Fetches an arbitrary endpoint as untyped JSON.
    pub async fn get_raw(&self, endpoint: &str) -> Result<serde_json::Value, ClientError> {
        self.get(endpoint, None::<&()>).await
    }

    fn url(&self, endpoint: &str) -> Result<Url, ClientError> {
        Ok(Url::parse(&format!("{}{endpoint}", self.base_url))?)
    }

    async fn get<T, Q>(&self, endpoint: &str, query: Option<&Q>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(endpoint)?;
        debug!(%url, "explorer request");

        let mut request = self.http.get(url).header(ACCEPT, "application/json");
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), endpoint, "explorer request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Explorer answers 404 for addresses it has no rows for.
fn empty_if_not_found<T: Default>(result: Result<T, ClientError>) -> Result<T, ClientError> {
    match result {
        Err(err) if err.is_not_found() => Ok(T::default()),
        other => other,
    }
}

fn non_empty(query: &PageQuery) -> Option<&PageQuery> {
    (!query.is_empty()).then_some(query)
}

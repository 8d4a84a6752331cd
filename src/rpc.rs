//! JSON-RPC client of a Quai node.
//!
//! All calls go through [`ChainRpc::invoke`], the named methods only add
//! the network prefix and typed parameters.

use std::{fmt::Debug, time::Duration};

use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, Bytes, U64, U256},
    rpc::client::RpcClient,
    transports::http::Http,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::{
    Network,
    error::ClientError,
    types::{BlockInfo, GasEstimate, NetworkStatus, PriorityFee, TransactionReceipt, TransactionRequest},
};

#[derive(Clone, derive_more::Debug)]
pub struct ChainRpc {
    #[debug(skip)]
    client: RpcClient,
    namespace: String,
}

impl ChainRpc {
    pub fn new(client: RpcClient, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn new_http(url: Url, namespace: impl Into<String>) -> Self {
        Self::new(RpcClient::new_http(url), namespace)
    }

    /// HTTP client whose requests fail after `timeout`.
    pub fn with_timeout(
        url: Url,
        namespace: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let client = RpcClient::new(Http::with_client(http, url), false);
        Ok(Self::new(client, namespace))
    }

    pub fn for_network(network: &Network) -> Self {
        Self::new_http(network.rpc_url().clone(), network.rpc_namespace())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Calls `method` verbatim with positional `params`.
    pub async fn invoke<R>(&self, method: &str, params: Vec<Value>) -> Result<R, ClientError>
    where
        R: DeserializeOwned + Debug + Send + Sync + Unpin + 'static,
    {
        debug!(method, "rpc request");
        let response: R = self.client.request(method.to_string(), params).await?;
        Ok(response)
    }

    async fn call<R>(&self, name: &str, params: Vec<Value>) -> Result<R, ClientError>
    where
        R: DeserializeOwned + Debug + Send + Sync + Unpin + 'static,
    {
        self.invoke(&format!("{}_{name}", self.namespace), params).await
    }

    pub async fn get_balance(
        &self,
        address: Address,
        block: BlockNumberOrTag,
    ) -> Result<U256, ClientError> {
        self.call("getBalance", vec![json!(address), json!(block)]).await
    }

    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256, ClientError> {
        self.call("estimateGas", vec![serde_json::to_value(tx)?]).await
    }

    pub async fn gas_price(&self) -> Result<U256, ClientError> {
        self.call("gasPrice", vec![]).await
    }

    /// Node suggested priority fee, [`PriorityFee::Unsupported`] when the
    /// node does not implement the method.
    pub async fn max_priority_fee_per_gas(&self) -> Result<PriorityFee, ClientError> {
        match self.call::<U256>("maxPriorityFeePerGas", vec![]).await {
            Ok(fee) => Ok(PriorityFee::Reported(fee)),
            Err(ClientError::MethodNotSupported(message)) => {
                warn!(%message, "priority fee not reported by node, assuming zero");
                Ok(PriorityFee::Unsupported)
            }
            Err(err) => Err(err),
        }
    }

    /// Broadcasts an already signed transaction.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, ClientError> {
        self.call("sendRawTransaction", vec![json!(raw)]).await
    }

    pub async fn block_number(&self) -> Result<u64, ClientError> {
        let number: U64 = self.call("blockNumber", vec![]).await?;
        Ok(number.to())
    }

    pub async fn get_block_by_number(
        &self,
        block: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Option<BlockInfo>, ClientError> {
        self.call("getBlockByNumber", vec![json!(block), json!(full_transactions)])
            .await
    }

    pub async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ClientError> {
        self.call("getTransactionReceipt", vec![json!(hash)]).await
    }

    /// Gas limit, gas price and priority fee of `tx`, fetched concurrently.
    pub async fn gas_estimate(&self, tx: &TransactionRequest) -> Result<GasEstimate, ClientError> {
        let (gas_limit, gas_price, priority_fee) = futures::try_join!(
            self.estimate_gas(tx),
            self.gas_price(),
            self.max_priority_fee_per_gas()
        )?;
        Ok(GasEstimate::new(gas_limit, gas_price, priority_fee))
    }

    pub async fn network_status(&self) -> Result<NetworkStatus, ClientError> {
        let (block_number, gas_price, priority_fee) = futures::try_join!(
            self.block_number(),
            self.gas_price(),
            self.max_priority_fee_per_gas()
        )?;
        Ok(NetworkStatus {
            block_number,
            gas_price,
            priority_fee,
        })
    }
}

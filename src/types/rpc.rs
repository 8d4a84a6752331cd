use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::num;

/// Transaction fields accepted by `estimateGas`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

impl TransactionRequest {
    pub fn transfer(from: Address, to: Address, value: U256) -> Self {
        Self {
            from,
            to,
            value: Some(value),
            data: None,
        }
    }
}

/// Block header fields returned by `getBlockByNumber`.
///
/// Quantities are kept as the hex strings the node returns.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub parent_hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub gas_limit: Option<String>,
    /// Transaction hashes, or full transaction objects when requested.
    #[serde(default)]
    pub transactions: Vec<serde_json::Value>,
    #[serde(default)]
    pub miner: Option<String>,
}

impl BlockInfo {
    pub fn number(&self) -> Option<u64> {
        self.number.as_deref().and_then(num::hex_to_u64)
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp.as_deref().and_then(num::hex_to_u64)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
}

impl TransactionReceipt {
    /// `Some(true)` for status `0x1`, `None` when the node omits the status.
    pub fn succeeded(&self) -> Option<bool> {
        self.status
            .as_deref()
            .and_then(num::hex_to_u64)
            .map(|status| status == 1)
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number.as_deref().and_then(num::hex_to_u64)
    }
}

/// Priority fee as far as the node is able to report it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityFee {
    Reported(U256),
    /// The node does not implement `maxPriorityFeePerGas`; treated as zero.
    Unsupported,
}

impl PriorityFee {
    pub fn value(&self) -> U256 {
        match self {
            PriorityFee::Reported(fee) => *fee,
            PriorityFee::Unsupported => U256::ZERO,
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, PriorityFee::Reported(_))
    }
}

/// Fee estimate for a transaction about to be signed.
#[derive(Clone, Copy, Debug)]
pub struct GasEstimate {
    pub gas_limit: U256,
    pub gas_price: U256,
    pub priority_fee: PriorityFee,
    /// `gas_limit * gas_price`, saturating.
    pub total_cost_wei: U256,
}

impl GasEstimate {
    pub fn new(gas_limit: U256, gas_price: U256, priority_fee: PriorityFee) -> Self {
        Self {
            gas_limit,
            gas_price,
            priority_fee,
            total_cost_wei: gas_limit.saturating_mul(gas_price),
        }
    }

    pub fn total_cost_native(&self) -> f64 {
        num::wei_to_native(self.total_cost_wei)
    }

    /// `false` when the priority fee is a default rather than a node-reported value.
    pub fn fee_reported(&self) -> bool {
        self.priority_fee.is_reported()
    }
}

/// Chain tip summary for the market dashboard.
#[derive(Clone, Copy, Debug)]
pub struct NetworkStatus {
    pub block_number: u64,
    pub gas_price: U256,
    pub priority_fee: PriorityFee,
}

impl NetworkStatus {
    pub fn gas_price_gwei(&self) -> f64 {
        num::wei_to_gwei(self.gas_price)
    }

    pub fn priority_fee_gwei(&self) -> f64 {
        num::wei_to_gwei(self.priority_fee.value())
    }
}

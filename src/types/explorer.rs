use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::lenient;
use crate::num;

/// Decimals assumed for tokens the explorer reports without metadata.
const DEFAULT_TOKEN_DECIMALS: u8 = num::NATIVE_DECIMALS;

/// One page of an explorer list endpoint.
///
/// Rows that do not decode are skipped, one malformed row never fails the page.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct Page<T> {
    #[serde(default = "Vec::new", deserialize_with = "lenient::skip_invalid")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_params: Option<serde_json::Map<String, serde_json::Value>>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_page_params: None,
        }
    }
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Query fetching the page following this one, if there is one.
    pub fn next_query(&self) -> Option<PageQuery> {
        self.next_page_params.as_ref().map(PageQuery::from_next_page_params)
    }
}

pub type TokensResponse = Page<TokenBalance>;
pub type TransactionsResponse = Page<Transaction>;
pub type TokenTransfersResponse = Page<TokenTransfer>;
pub type TokenHoldersResponse = Page<TokenHolder>;
pub type BlocksResponse = Page<Block>;

/// Reference to an address as embedded in explorer rows.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddressRef {
    pub hash: String,
    #[serde(default)]
    pub is_contract: bool,
}

/// Account details of `/v2/addresses/{address}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddressInfo {
    pub hash: String,
    #[serde(default)]
    pub implementation_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_contract: bool,
    #[serde(default)]
    pub created_tx_hash: Option<String>,
    #[serde(default, deserialize_with = "lenient::num_or_default")]
    pub transactions_count: u64,
    #[serde(default, deserialize_with = "lenient::num_or_default")]
    pub tokens_count: u64,
}

impl AddressInfo {
    /// Details of an address the explorer has never seen.
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            hash: address.into(),
            ..Default::default()
        }
    }
}

/// Token metadata embedded in balance and transfer rows.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenRef {
    #[serde(default, alias = "address_hash")]
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_num")]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

impl TokenRef {
    pub fn decimals_or_default(&self) -> u8 {
        self.decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS)
    }

    /// Symbol, falling back to name and then to the contract address.
    pub fn label(&self) -> &str {
        self.symbol
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.address)
    }
}

/// Token holding of an address: raw balance plus the fiat value reported by the explorer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: TokenRef,
    /// Raw balance in token subunits.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub balance: Option<String>,
    /// Fiat value reported by the explorer, not necessarily numeric.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub value: Option<String>,
}

impl TokenBalance {
    /// `balance / 10^decimals`, `0.0` if the balance is missing or malformed.
    pub fn display_amount(&self) -> f64 {
        num::subunit_to_decimal(self.balance.as_deref(), self.token.decimals_or_default())
    }

    /// Reported fiat value, unparsable values count as `0.0`.
    pub fn value_usd(&self) -> f64 {
        num::parse_fiat(self.value.as_deref())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    #[serde(default)]
    pub from: AddressRef,
    #[serde(default)]
    pub to: Option<AddressRef>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub value: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient::opt_num")]
    pub tx_type: Option<u8>,
}

impl Transaction {
    /// Transferred native amount in display units.
    pub fn value_native(&self) -> f64 {
        num::subunit_to_decimal(self.value.as_deref(), num::NATIVE_DECIMALS)
    }

    /// Paid fee (`gas_used * gas_price`) in display units.
    pub fn fee_native(&self) -> f64 {
        let gas_used = self.gas_used.as_deref().and_then(num::parse_subunits);
        let gas_price = self.gas_price.as_deref().and_then(num::parse_subunits);
        gas_used
            .zip(gas_price)
            .and_then(|(used, price)| used.checked_mul(price))
            .map(num::wei_to_native)
            .unwrap_or_default()
    }

    /// `true` if `address` sent this transaction (case-insensitive).
    pub fn is_outgoing(&self, address: &str) -> bool {
        self.from.hash.eq_ignore_ascii_case(address)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransferTotal {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_num")]
    pub decimals: Option<u8>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenTransfer {
    #[serde(alias = "transaction_hash")]
    pub tx_hash: String,
    #[serde(default)]
    pub from: AddressRef,
    #[serde(default)]
    pub to: AddressRef,
    #[serde(default)]
    pub total: TransferTotal,
    #[serde(default)]
    pub token: TokenRef,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::num_or_default")]
    pub block_number: u64,
}

impl TokenTransfer {
    /// Transferred amount in token display units.
    pub fn amount(&self) -> f64 {
        let decimals = self
            .total
            .decimals
            .unwrap_or_else(|| self.token.decimals_or_default());
        num::subunit_to_decimal(self.total.value.as_deref(), decimals)
    }
}

/// Token metadata of `/v2/tokens/{address}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(alias = "address_hash")]
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_num")]
    pub decimals: Option<u8>,
    #[serde(default, alias = "holders_count", deserialize_with = "lenient::num_or_default")]
    pub holders: u64,
    #[serde(default)]
    pub total_supply: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<String>,
}

impl TokenInfo {
    pub fn total_supply_display(&self) -> f64 {
        num::subunit_to_decimal(
            self.total_supply.as_deref(),
            self.decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS),
        )
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenHolder {
    pub address: AddressRef,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub value: Option<String>,
    /// Share of the total supply in percent.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub percentage: Option<String>,
}

/// Network-wide statistics of `/v2/stats`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    #[serde(default)]
    pub total_blocks: Option<String>,
    #[serde(default)]
    pub total_transactions: Option<String>,
    #[serde(default)]
    pub total_addresses: Option<String>,
    #[serde(default)]
    pub transactions_today: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_num")]
    pub average_block_time: Option<f64>,
    #[serde(default)]
    pub coin_price: Option<String>,
    #[serde(default)]
    pub market_cap: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(alias = "height", deserialize_with = "lenient::num_or_default")]
    pub number: u64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub gas_limit: Option<String>,
    #[serde(default, alias = "transaction_count", deserialize_with = "lenient::num_or_default")]
    pub tx_count: u64,
    #[serde(default)]
    pub miner: Option<AddressRef>,
}

impl Block {
    /// Gas used as a share of the gas limit, in percent.
    pub fn utilization_pct(&self) -> f64 {
        let used = num::subunit_to_decimal(self.gas_used.as_deref(), 0);
        let limit = num::subunit_to_decimal(self.gas_limit.as_deref(), 0);
        if limit > 0.0 { used / limit * 100.0 } else { 0.0 }
    }
}

/// Legacy `?module=stats&action=coinprice` response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoinPriceResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<CoinPrice>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoinPrice {
    #[serde(default)]
    pub quai_usd: Option<String>,
    #[serde(default)]
    pub quai_btc: Option<String>,
}

impl CoinPriceResponse {
    /// USD price of the native unit, `None` when upstream omits it.
    pub fn usd(&self) -> Option<f64> {
        self.result
            .as_ref()
            .and_then(|r| r.quai_usd.as_deref())
            .and_then(|p| p.trim().parse::<f64>().ok())
            .filter(|p| p.is_finite())
    }

    pub fn btc(&self) -> Option<f64> {
        self.result
            .as_ref()
            .and_then(|r| r.quai_btc.as_deref())
            .and_then(|p| p.trim().parse::<f64>().ok())
            .filter(|p| p.is_finite())
    }
}

/// Legacy `?module=stats&action=tokensupply` response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenSupplyResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

/// Token standard filter of the address tokens endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Erc20,
    Erc721,
    Erc1155,
}

/// Query parameters of `/v2/addresses/{address}/tokens`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TokenQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_token_type_by: Option<TokenType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_count: Option<u32>,
}

/// Query parameters of `/v2/addresses/{address}/transactions`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TransactionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_count: Option<u32>,
}

/// Generic pagination parameters, usually built from a previous page's
/// `next_page_params`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageQuery(BTreeMap<String, String>);

impl PageQuery {
    pub fn items_count(mut self, count: u32) -> Self {
        self.0.insert("items_count".to_string(), count.to_string());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn from_next_page_params(params: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self(
            params
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| {
                    let v = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_token_balance_with_string_decimals() {
        let row: TokenBalance = serde_json::from_value(json!({
            "token": {"address": "0x0042", "symbol": "USDC", "decimals": "6"},
            "balance": "2500000",
            "value": "2.5"
        }))
        .unwrap();
        assert_eq!(row.token.decimals, Some(6));
        assert_eq!(row.display_amount(), 2.5);
        assert_eq!(row.value_usd(), 2.5);
    }

    #[test]
    fn test_token_balance_malformed_fields() {
        let row: TokenBalance = serde_json::from_value(json!({
            "token": {"address_hash": "0x0042", "decimals": null},
            "balance": "oops",
            "value": "not-a-number"
        }))
        .unwrap();
        assert_eq!(row.token.address, "0x0042");
        assert_eq!(row.token.label(), "0x0042");
        assert_eq!(row.display_amount(), 0.0);
        assert_eq!(row.value_usd(), 0.0);
    }

    #[test]
    fn test_tokens_page_skips_malformed_rows() {
        let page: TokensResponse = serde_json::from_value(json!({
            "items": [
                {"token": {"address": "0x01", "symbol": "USDC", "decimals": "6"}, "balance": "2500000", "value": "2.50"},
                {"token": {"address": "0x02", "symbol": "NUM", "decimals": 18}, "balance": 1000, "value": 1.25},
                {"token": {"symbol": "WIDE", "decimals": 300}, "balance": "5", "value": {"usd": 1}},
                "garbage",
                {"token": 7}
            ],
            "next_page_params": null
        }))
        .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[1].value_usd(), 1.25);
        assert_eq!(page.items[1].balance.as_deref(), Some("1000"));

        let wide = &page.items[2];
        assert_eq!(wide.token.address, "");
        assert_eq!(wide.token.decimals_or_default(), 18);
        assert_eq!(wide.value_usd(), 0.0);

        let empty: TokensResponse = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_coin_price() {
        let resp: CoinPriceResponse = serde_json::from_value(json!({
            "status": "1",
            "message": "OK",
            "result": {"quai_usd": "0.0731", "quai_btc": "0.00000071"}
        }))
        .unwrap();
        assert_eq!(resp.usd(), Some(0.0731));
        assert_eq!(resp.btc(), Some(0.00000071));

        let missing: CoinPriceResponse =
            serde_json::from_value(json!({"status": "0", "message": "No price", "result": null}))
                .unwrap();
        assert_eq!(missing.usd(), None);
    }

    #[test]
    fn test_transaction_fee() {
        let tx: Transaction = serde_json::from_value(json!({
            "hash": "0xabc",
            "from": {"hash": "0x00AA", "is_contract": false},
            "to": null,
            "value": "1000000000000000000",
            "gas_used": "21000",
            "gas_price": "1000000000",
            "type": 0
        }))
        .unwrap();
        assert_eq!(tx.value_native(), 1.0);
        assert_eq!(tx.fee_native(), 0.000021);
        assert!(tx.is_outgoing("0x00aa"));
    }

    #[test]
    fn test_next_page_query() {
        let page: TransactionsResponse = serde_json::from_value(json!({
            "items": [],
            "next_page_params": {"block_number": 120, "index": 3, "items_count": 50, "hash": null}
        }))
        .unwrap();
        let next = page.next_query().unwrap();
        assert_eq!(
            next,
            PageQuery::default()
                .param("block_number", "120")
                .param("index", "3")
                .items_count(50)
        );
        assert!(Page::<Transaction>::default().next_query().is_none());
    }

    #[test]
    fn test_block_lenient_numbers() {
        let block: Block = serde_json::from_value(json!({
            "height": "1500",
            "gas_used": "500",
            "gas_limit": "1000",
            "transaction_count": 4
        }))
        .unwrap();
        assert_eq!(block.number, 1500);
        assert_eq!(block.tx_count, 4);
        assert_eq!(block.utilization_pct(), 50.0);
    }
}

//! Network-wide market overview: explorer statistics, price and chain tip.

use std::future::Future;

use tracing::debug;

use crate::{
    error::ClientError,
    num,
    portfolio::SourceState,
    types::{BlocksResponse, CoinPriceResponse, NetworkStats, NetworkStatus},
};

pub trait MarketSource {
    fn network_stats(&self) -> impl Future<Output = Result<NetworkStats, ClientError>> + Send;

    fn coin_price(&self) -> impl Future<Output = Result<CoinPriceResponse, ClientError>> + Send;

    fn network_status(&self) -> impl Future<Output = Result<NetworkStatus, ClientError>> + Send;

    fn blocks(&self) -> impl Future<Output = Result<BlocksResponse, ClientError>> + Send;
}

#[derive(Clone, Debug, Default)]
pub struct MarketOverview {
    pub network_stats: SourceState<NetworkStats>,
    pub coin_price: SourceState<CoinPriceResponse>,
    pub network_status: SourceState<NetworkStatus>,
    pub blocks: SourceState<BlocksResponse>,
}

/// Loads every part of the overview concurrently.
pub async fn load_market<S: MarketSource>(source: &S) -> MarketOverview {
    let (network_stats, coin_price, network_status, blocks) = tokio::join!(
        source.network_stats(),
        source.coin_price(),
        source.network_status(),
        source.blocks(),
    );
    let overview = MarketOverview {
        network_stats: network_stats.into(),
        coin_price: coin_price.into(),
        network_status: network_status.into(),
        blocks: blocks.into(),
    };
    debug!(is_error = overview.is_error(), "market overview loaded");
    overview
}

impl MarketOverview {
    /// Status covers stats and price, node status and blocks are optional.
    pub fn is_loading(&self) -> bool {
        self.network_stats.is_loading() || self.coin_price.is_loading()
    }

    pub fn is_error(&self) -> bool {
        self.network_stats.is_failed() || self.coin_price.is_failed()
    }

    pub fn price_usd(&self) -> Option<f64> {
        self.coin_price.ready().and_then(CoinPriceResponse::usd)
    }

    pub fn price_btc(&self) -> Option<f64> {
        self.coin_price.ready().and_then(CoinPriceResponse::btc)
    }

    pub fn market_cap_usd(&self) -> Option<f64> {
        self.network_stats
            .ready()
            .and_then(|stats| stats.market_cap.as_deref())
            .map(|cap| num::parse_fiat(Some(cap)))
    }

    pub fn block_number(&self) -> Option<u64> {
        self.network_status.ready().map(|status| status.block_number)
    }

    /// Mean gas utilization of the recent blocks, in percent.
    pub fn average_utilization_pct(&self) -> Option<f64> {
        let blocks = &self.blocks.ready()?.items;
        if blocks.is_empty() {
            return None;
        }
        let total = blocks
            .iter()
            .map(|b| b.utilization_pct())
            .fold(0.0, |acc, pct| acc + pct);
        Some(total / blocks.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::primitives::U256;
    use serde_json::json;

    use super::*;
    use crate::types::PriorityFee;

    struct FakeMarket {
        stats_fail: bool,
    }

    impl MarketSource for FakeMarket {
        async fn network_stats(&self) -> Result<NetworkStats, ClientError> {
            if self.stats_fail {
                return Err(ClientError::Http {
                    status: 503,
                    message: "maintenance".to_string(),
                });
            }
            Ok(serde_json::from_value(json!({"market_cap": "1250000.5", "average_block_time": 5000.0}))?)
        }

        async fn coin_price(&self) -> Result<CoinPriceResponse, ClientError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(serde_json::from_value(
                json!({"status": "1", "result": {"quai_usd": "0.05", "quai_btc": "0.0000005"}}),
            )?)
        }

        async fn network_status(&self) -> Result<NetworkStatus, ClientError> {
            Ok(NetworkStatus {
                block_number: 1_000,
                gas_price: U256::from(1_000_000_000u64),
                priority_fee: PriorityFee::Unsupported,
            })
        }

        async fn blocks(&self) -> Result<BlocksResponse, ClientError> {
            Ok(serde_json::from_value(json!({
                "items": [
                    {"height": 1000, "gas_used": "50", "gas_limit": "100"},
                    {"height": 999, "gas_used": "0", "gas_limit": "100"}
                ]
            }))?)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_market() {
        let overview = load_market(&FakeMarket { stats_fail: false }).await;
        assert!(!overview.is_loading());
        assert!(!overview.is_error());
        assert_eq!(overview.price_usd(), Some(0.05));
        assert_eq!(overview.price_btc(), Some(0.0000005));
        assert_eq!(overview.market_cap_usd(), Some(1250000.5));
        assert_eq!(overview.block_number(), Some(1_000));
        assert_eq!(overview.average_utilization_pct(), Some(25.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_stats_keep_price() {
        let overview = load_market(&FakeMarket { stats_fail: true }).await;
        assert!(overview.is_error());
        assert_eq!(overview.price_usd(), Some(0.05));
        assert_eq!(overview.market_cap_usd(), None);
    }
}

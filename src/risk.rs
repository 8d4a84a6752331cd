//! Concentration metrics derived from aggregated data.

use crate::{portfolio::PortfolioSnapshot, types::TokenHolder};

const MODERATE_SHARE_PCT: f64 = 20.0;
const HIGH_SHARE_PCT: f64 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_share_pct(share_pct: f64) -> Self {
        if share_pct >= HIGH_SHARE_PCT {
            RiskLevel::High
        } else if share_pct >= MODERATE_SHARE_PCT {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConcentrationRisk {
    /// Largest single-asset share of the portfolio value, in percent.
    pub largest_share_pct: f64,
    pub symbol: Option<String>,
    pub level: RiskLevel,
}

/// Risk of the portfolio being dominated by one asset.
///
/// An empty portfolio is `Low`.
pub fn concentration(snapshot: &PortfolioSnapshot) -> ConcentrationRisk {
    match snapshot.allocations.first() {
        Some(top) => ConcentrationRisk {
            largest_share_pct: top.share_pct,
            symbol: Some(top.symbol.clone()),
            level: RiskLevel::from_share_pct(top.share_pct),
        },
        None => ConcentrationRisk {
            largest_share_pct: 0.0,
            symbol: None,
            level: RiskLevel::Low,
        },
    }
}

/// Summed supply share of the first `n` holders, in percent.
pub fn top_holder_share(holders: &[TokenHolder], n: usize) -> f64 {
    holders
        .iter()
        .take(n)
        .map(|holder| crate::num::parse_fiat(holder.percentage.as_deref()))
        .fold(0.0, |acc, pct| acc + pct)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::portfolio::Allocation;

    fn snapshot_with_top(share_pct: f64) -> PortfolioSnapshot {
        PortfolioSnapshot {
            allocations: vec![Allocation {
                symbol: "QUAI".to_string(),
                value_usd: 1.0,
                share_pct,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(concentration(&snapshot_with_top(19.9)).level, RiskLevel::Low);
        assert_eq!(concentration(&snapshot_with_top(20.0)).level, RiskLevel::Moderate);
        assert_eq!(concentration(&snapshot_with_top(39.9)).level, RiskLevel::Moderate);
        assert_eq!(concentration(&snapshot_with_top(40.0)).level, RiskLevel::High);

        let empty = concentration(&PortfolioSnapshot::default());
        assert_eq!(empty.level, RiskLevel::Low);
        assert_eq!(empty.symbol, None);
    }

    #[test]
    fn test_top_holder_share() {
        let holders: Vec<TokenHolder> = serde_json::from_value(json!([
            {"address": {"hash": "0x01"}, "value": "500", "percentage": "50.5"},
            {"address": {"hash": "0x02"}, "value": "300", "percentage": "n/a"},
            {"address": {"hash": "0x03"}, "value": "200", "percentage": "20"}
        ]))
        .unwrap();
        assert_eq!(top_holder_share(&holders, 2), 50.5);
        assert_eq!(top_holder_share(&holders, 10), 70.5);
        assert_eq!(top_holder_share(&[], 5), 0.0);
    }
}

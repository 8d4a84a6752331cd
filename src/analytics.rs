//! Transaction and block analytics derived from explorer pages.

use crate::types::{Block, Transaction};

/// Gas units per reported unit of [`BlockActivity::gas_used_giga`].
const GIGA: f64 = 1e9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

/// One transaction as seen from the tracked address.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionFlow {
    pub hash: String,
    pub direction: Direction,
    pub value_native: f64,
    pub value_usd: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionSummary {
    pub count: usize,
    pub volume_native: f64,
    pub volume_usd: f64,
    /// `volume_usd / count`, `0.0` without transactions.
    pub average_value_usd: f64,
    pub sent: usize,
    pub received: usize,
}

/// Transaction count and gas of one block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockActivity {
    pub number: u64,
    pub tx_count: u64,
    pub gas_used_giga: f64,
}

/// A transaction is received when `address` is its recipient (case-insensitive),
/// everything else counts as sent.
pub fn direction(tx: &Transaction, address: &str) -> Direction {
    let received = tx
        .to
        .as_ref()
        .is_some_and(|to| to.hash.eq_ignore_ascii_case(address));
    if received { Direction::Receive } else { Direction::Send }
}

pub fn transaction_flows(txs: &[Transaction], price_usd: Option<f64>, address: &str) -> Vec<TransactionFlow> {
    let price = price_usd.filter(|p| p.is_finite()).unwrap_or_default();
    txs.iter()
        .map(|tx| {
            let value_native = tx.value_native();
            TransactionFlow {
                hash: tx.hash.clone(),
                direction: direction(tx, address),
                value_native,
                value_usd: value_native * price,
            }
        })
        .collect()
}

/// Volume and direction totals of `txs`. A missing price values the volume at zero.
pub fn transaction_summary(txs: &[Transaction], price_usd: Option<f64>, address: &str) -> TransactionSummary {
    let flows = transaction_flows(txs, price_usd, address);
    let volume_native = flows.iter().fold(0.0, |acc, flow| acc + flow.value_native);
    let volume_usd = flows.iter().fold(0.0, |acc, flow| acc + flow.value_usd);
    let received = flows
        .iter()
        .filter(|flow| flow.direction == Direction::Receive)
        .count();

    TransactionSummary {
        count: flows.len(),
        volume_native,
        volume_usd,
        average_value_usd: if flows.is_empty() {
            0.0
        } else {
            volume_usd / flows.len() as f64
        },
        sent: flows.len() - received,
        received,
    }
}

/// Activity of the `limit` most recent blocks, oldest first.
///
/// `blocks` is expected newest first, the order the explorer lists them in.
pub fn block_activity(blocks: &[Block], limit: usize) -> Vec<BlockActivity> {
    let mut activity: Vec<_> = blocks
        .iter()
        .take(limit)
        .map(|block| BlockActivity {
            number: block.number,
            tx_count: block.tx_count,
            gas_used_giga: block
                .gas_used
                .as_deref()
                .and_then(|gas| gas.trim().parse::<u64>().ok())
                .map(|gas| gas as f64 / GIGA)
                .unwrap_or_default(),
        })
        .collect();
    activity.reverse();
    activity
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ME: &str = "0x00000000000000000000000000000000000000Aa";

    fn tx(hash: &str, from: &str, to: Option<&str>, value: &str) -> Transaction {
        serde_json::from_value(json!({
            "hash": hash,
            "from": {"hash": from},
            "to": to.map(|hash| json!({"hash": hash})),
            "value": value
        }))
        .unwrap()
    }

    #[test]
    fn test_transaction_summary() {
        let txs = [
            tx("0x01", ME, Some("0x0b"), "1000000000000000000"),
            tx("0x02", "0x0b", Some(&ME.to_lowercase()), "3000000000000000000"),
            tx("0x03", ME, None, "garbage"),
        ];
        let summary = transaction_summary(&txs, Some(0.5), ME);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.volume_native, 4.0);
        assert_eq!(summary.volume_usd, 2.0);
        assert_eq!(summary.average_value_usd, 2.0 / 3.0);
        assert_eq!(summary.received, 1);
        assert_eq!(summary.sent, 2);

        let flows = transaction_flows(&txs, Some(0.5), ME);
        assert_eq!(flows[1].direction, Direction::Receive);
        assert_eq!(flows[1].value_usd, 1.5);
        // Contract creations have no recipient
        assert_eq!(flows[2].direction, Direction::Send);
        assert_eq!(flows[2].value_native, 0.0);
    }

    #[test]
    fn test_transaction_summary_without_price() {
        let txs = [tx("0x01", "0x0b", Some(ME), "2000000000000000000")];
        let summary = transaction_summary(&txs, None, ME);
        assert_eq!(summary.volume_native, 2.0);
        assert_eq!(summary.volume_usd, 0.0);
        assert_eq!(summary.average_value_usd, 0.0);

        assert_eq!(transaction_summary(&[], Some(1.0), ME), TransactionSummary::default());
    }

    #[test]
    fn test_block_activity() {
        let blocks: Vec<Block> = serde_json::from_value(json!([
            {"height": 12, "transaction_count": 4, "gas_used": "3000000000"},
            {"height": 11, "transaction_count": 0, "gas_used": null},
            {"height": 10, "transaction_count": 9, "gas_used": "1500000000"}
        ]))
        .unwrap();

        let activity = block_activity(&blocks, 2);
        assert_eq!(
            activity,
            [
                BlockActivity {
                    number: 11,
                    tx_count: 0,
                    gas_used_giga: 0.0
                },
                BlockActivity {
                    number: 12,
                    tx_count: 4,
                    gas_used_giga: 3.0
                },
            ]
        );
        assert_eq!(block_activity(&blocks, 20).len(), 3);
    }
}

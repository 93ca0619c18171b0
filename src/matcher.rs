//! Decide which transactions of a block belong to which subscriber.
use std::collections::HashSet;

use thiserror::Error;

use crate::types::{normalize_address, Block, BlockHeight, TransactionRecord};

/// A block could not be matched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    /// The source returned a block without a transaction list.
    #[error("block {0} carries no transaction list")]
    MissingTransactions(BlockHeight),
}

/// One (subscriber, transaction) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Normalized subscriber address the record belongs to.
    pub address: String,
    /// Record to append to that subscriber's log.
    pub record: TransactionRecord,
}

/// Match every transaction of `block` against `subscribers`.
///
/// Matches come out in block order; for a single transaction the sender's
/// match precedes the recipient's. A transaction between two subscribed
/// addresses (or a self-transfer) yields one match per side.
pub fn match_block(block: &Block, subscribers: &HashSet<String>) -> Result<Vec<Match>, MatchError> {
    let txs = block
        .transactions
        .as_ref()
        .ok_or(MatchError::MissingTransactions(block.number))?;

    if subscribers.is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for tx in txs {
        let from = normalize_address(&tx.from);
        let to = tx.to.as_deref().map(normalize_address);

        let from_hit = subscribers.contains(&from);
        let to_hit = to.as_ref().is_some_and(|t| subscribers.contains(t));
        if !from_hit && !to_hit {
            continue;
        }

        // `from` is stored folded, `to` as observed
        let record = TransactionRecord {
            hash: tx.hash.clone(),
            from: from.clone(),
            to: tx.to.clone().unwrap_or_default(),
            value: tx.value.to_string(),
            block_number: block.number.to_string(),
            timestamp: block.timestamp.to_string(),
        };

        if from_hit {
            out.push(Match {
                address: from,
                record: record.clone(),
            });
        }
        if let Some(to) = to.filter(|_| to_hit) {
            out.push(Match {
                address: to,
                record,
            });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChainTransaction;

    fn tx(hash: &str, from: &str, to: Option<&str>, value: u128) -> ChainTransaction {
        ChainTransaction {
            hash: hash.into(),
            from: from.into(),
            to: to.map(Into::into),
            value,
            ..Default::default()
        }
    }

    fn block(number: u64, txs: Vec<ChainTransaction>) -> Block {
        Block {
            number,
            timestamp: 1_700_000_000,
            transactions: Some(txs),
            ..Default::default()
        }
    }

    fn subs(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sender_match_folds_from_and_keeps_to_case() {
        let b = block(10, vec![tx("0x1", "0xAAA", Some("0xBbB"), 1000)]);
        let got = match_block(&b, &subs(&["0xaaa"])).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].address, "0xaaa");
        let rec = &got[0].record;
        assert_eq!(rec.from, "0xaaa");
        assert_eq!(rec.to, "0xBbB");
        assert_eq!(rec.value, "1000");
        assert_eq!(rec.block_number, "10");
        assert_eq!(rec.timestamp, "1700000000");
    }

    #[test]
    fn recipient_match_is_case_insensitive() {
        let b = block(3, vec![tx("0x2", "0x111", Some("0xCCC"), 5)]);
        let got = match_block(&b, &subs(&["0xccc"])).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].address, "0xccc");
        assert_eq!(got[0].record.to, "0xCCC");
    }

    #[test]
    fn unsubscribed_addresses_produce_nothing() {
        let b = block(3, vec![tx("0x2", "0x111", Some("0x222"), 5)]);
        assert!(match_block(&b, &subs(&["0x333"])).unwrap().is_empty());
    }

    #[test]
    fn both_sides_subscribed_yield_two_matches_in_order() {
        let b = block(4, vec![tx("0x3", "0xaaa", Some("0xbbb"), 7)]);
        let got = match_block(&b, &subs(&["0xaaa", "0xbbb"])).unwrap();
        let addrs: Vec<_> = got.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(addrs, ["0xaaa", "0xbbb"]);
        assert_eq!(got[0].record, got[1].record);
    }

    #[test]
    fn self_transfer_matches_twice() {
        let b = block(5, vec![tx("0x4", "0xAAA", Some("0xaaa"), 1)]);
        let got = match_block(&b, &subs(&["0xaaa"])).unwrap();
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|m| m.address == "0xaaa"));
    }

    #[test]
    fn contract_creation_matches_on_sender_only() {
        let b = block(6, vec![tx("0x5", "0xaaa", None, 0)]);
        let got = match_block(&b, &subs(&["0xaaa", ""])).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].record.to, "");
    }

    #[test]
    fn preserves_block_order() {
        let b = block(
            7,
            vec![
                tx("0xa", "0x1", Some("0xaaa"), 1),
                tx("0xb", "0x2", Some("0x3"), 1),
                tx("0xc", "0xaaa", Some("0x4"), 1),
            ],
        );
        let got = match_block(&b, &subs(&["0xaaa"])).unwrap();
        let hashes: Vec<_> = got.iter().map(|m| m.record.hash.as_str()).collect();
        assert_eq!(hashes, ["0xa", "0xc"]);
    }

    #[test]
    fn missing_transaction_list_is_an_error() {
        let b = Block {
            number: 9,
            transactions: None,
            ..Default::default()
        };
        assert_eq!(
            match_block(&b, &subs(&["0xaaa"])),
            Err(MatchError::MissingTransactions(9))
        );
        // even with nobody subscribed
        assert!(match_block(&b, &HashSet::new()).is_err());
    }

    #[test]
    fn no_subscribers_short_circuits() {
        let b = block(8, vec![tx("0x1", "0xaaa", Some("0xbbb"), 1)]);
        assert!(match_block(&b, &HashSet::new()).unwrap().is_empty());
    }
}

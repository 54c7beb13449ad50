// UTXO replay
//
// Balances are never stored; they are recomputed by replaying every
// transaction of every block in order. The admission filter replays a
// hypothetical chain (current blocks + a candidate transaction list)
// through the same fold.

use std::collections::BTreeMap;

use crate::primitives::block::BlockEnvelope;
use crate::primitives::transaction::Transaction;

/// Round a balance to 8 fractional digits.
pub fn round8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}

fn apply(balances: &mut BTreeMap<String, f64>, tx: &Transaction) {
    *balances.entry(tx.recipient.clone()).or_insert(0.0) += tx.amount;
    *balances.entry(tx.sender.clone()).or_insert(0.0) -= tx.amount;
}

/// Replay `blocks` plus a hypothetical trailing transaction list into an
/// address → balance map. Entries are created on first sight; every
/// balance is rounded to 8 decimals after the walk. Pure.
pub fn utxo_with_pending(
    blocks: &[BlockEnvelope],
    pending: &[Transaction],
) -> BTreeMap<String, f64> {
    let mut balances = BTreeMap::new();
    for envelope in blocks {
        for tx in &envelope.block.transactions {
            apply(&mut balances, tx);
        }
    }
    for tx in pending {
        apply(&mut balances, tx);
    }
    for value in balances.values_mut() {
        *value = round8(*value);
    }
    balances
}

/// Balance map of a finalized chain.
pub fn utxo(blocks: &[BlockEnvelope]) -> BTreeMap<String, f64> {
    utxo_with_pending(blocks, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::block::{BlockBody, BlockEnvelope};
    use crate::primitives::transaction::COINBASE_SENDER;

    fn block(index: u64, transactions: Vec<Transaction>) -> BlockEnvelope {
        BlockEnvelope::seal(BlockBody {
            index,
            difficulty: 1,
            nonce: 0,
            timestamp: "test".to_string(),
            transactions,
            previous_hash: "test".to_string(),
        })
    }

    #[test]
    fn test_empty_chain_empty_balances() {
        assert!(utxo(&[]).is_empty());
    }

    #[test]
    fn test_coinbase_credits_miner_and_debits_mint() {
        let chain = vec![block(1, vec![Transaction::coinbase("miner")])];
        let balances = utxo(&chain);
        assert_eq!(balances["miner"], 1.0);
        assert_eq!(balances[COINBASE_SENDER], -1.0);
    }

    #[test]
    fn test_transfer_moves_value() {
        let chain = vec![
            block(1, vec![Transaction::coinbase("alice")]),
            block(
                2,
                vec![
                    Transaction::new("alice", "bob", 0.25),
                    Transaction::coinbase("alice"),
                ],
            ),
        ];
        let balances = utxo(&chain);
        assert_eq!(balances["alice"], 1.75);
        assert_eq!(balances["bob"], 0.25);
    }

    #[test]
    fn test_unknown_sender_goes_negative() {
        let chain = vec![block(1, vec![Transaction::new("ghost", "bob", 3.0)])];
        let balances = utxo(&chain);
        assert_eq!(balances["ghost"], -3.0);
        assert_eq!(balances["bob"], 3.0);
    }

    #[test]
    fn test_balances_rounded_to_8_decimals() {
        // 0.1 + 0.2 accumulates binary error well below 1e-8
        let chain = vec![block(
            1,
            vec![
                Transaction::new("0", "carol", 0.1),
                Transaction::new("0", "carol", 0.2),
            ],
        )];
        assert_eq!(utxo(&chain)["carol"], 0.3);
    }

    #[test]
    fn test_left_fold_law() {
        // utxo(chain) == utxo(chain[..n-1]) updated by the last block
        let chain = vec![
            block(1, vec![Transaction::coinbase("alice")]),
            block(
                2,
                vec![
                    Transaction::new("alice", "bob", 0.5),
                    Transaction::coinbase("miner"),
                ],
            ),
        ];
        let last = &chain[chain.len() - 1];
        let folded = utxo_with_pending(&chain[..1], &last.block.transactions);
        assert_eq!(folded, utxo(&chain));
    }

    #[test]
    fn test_pending_overlay_does_not_touch_chain() {
        let chain = vec![block(1, vec![Transaction::coinbase("alice")])];
        let pending = vec![Transaction::new("alice", "bob", 0.4)];
        let with = utxo_with_pending(&chain, &pending);
        assert_eq!(with["alice"], 0.6);
        // the chain itself is unchanged
        assert_eq!(utxo(&chain)["alice"], 1.0);
    }
}

// Transaction Mempool
//
// In-memory buffer of pending transactions in strict insertion order.
// There is no fee market: the admission filter walks the buffer front
// to back and takes the longest prefix-stable subset that keeps every
// non-coinbase balance non-negative. Rejected transactions stay put;
// they may become valid once more blocks land.

use crate::consensus::utxo::utxo_with_pending;
use crate::primitives::block::BlockEnvelope;
use crate::primitives::transaction::{Transaction, COINBASE_SENDER};

#[derive(Debug, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Mempool::default()
    }

    pub fn push(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Greedy admission in insertion order. For each candidate, replay
    /// the chain plus the tentatively admitted set plus the candidate;
    /// admit iff every balance except the mint's stays non-negative.
    /// Returns the admitted transactions and their mempool indices.
    pub fn admit(&self, blocks: &[BlockEnvelope]) -> (Vec<usize>, Vec<Transaction>) {
        let mut indices = Vec::new();
        let mut admitted: Vec<Transaction> = Vec::new();

        for (i, tx) in self.pending.iter().enumerate() {
            let mut candidate = admitted.clone();
            candidate.push(tx.clone());

            let mut balances = utxo_with_pending(blocks, &candidate);
            balances.remove(COINBASE_SENDER);

            if balances.values().all(|value| *value >= 0.0) {
                indices.push(i);
                admitted.push(tx.clone());
            }
        }

        (indices, admitted)
    }

    /// Drop the transactions committed by a mining pass. Indices refer
    /// to positions captured at admit time; the buffer only grows at the
    /// tail in between, so they are still in range and still point at
    /// the same entries.
    pub fn prune(&mut self, indices: &[usize]) {
        for &i in indices.iter().rev() {
            if i < self.pending.len() {
                self.pending.remove(i);
            }
        }
    }

    /// Wholesale replacement by a peer's pending set (chain adoption).
    /// This is a trust boundary: non-finite amounts cannot be admitted
    /// or hashed meaningfully, and a pending coinbase would mint for
    /// free, so both are dropped here like at RPC intake.
    pub fn replace(&mut self, pending: Vec<Transaction>) {
        self.pending = pending
            .into_iter()
            .filter(|tx| tx.amount.is_finite() && !tx.is_coinbase())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::block::BlockBody;

    fn funded_chain(addr: &str, amount_blocks: usize) -> Vec<BlockEnvelope> {
        (0..amount_blocks)
            .map(|i| {
                BlockEnvelope::seal(BlockBody {
                    index: i as u64 + 1,
                    difficulty: 1,
                    nonce: 0,
                    timestamp: "test".to_string(),
                    transactions: vec![Transaction::coinbase(addr)],
                    previous_hash: "test".to_string(),
                })
            })
            .collect()
    }

    #[test]
    fn test_admits_affordable_transfer() {
        let chain = funded_chain("alice", 1);
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 0.25));

        let (indices, admitted) = pool.admit(&chain);
        assert_eq!(indices, vec![0]);
        assert_eq!(admitted.len(), 1);
    }

    #[test]
    fn test_rejects_overspend() {
        let chain = funded_chain("alice", 1);
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 2.0));

        let (indices, admitted) = pool.admit(&chain);
        assert!(indices.is_empty());
        assert!(admitted.is_empty());
        // the overspend stays pending
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_greedy_insertion_order() {
        // alice holds 1; two 0.6 spends cannot both fit, the first wins
        let chain = funded_chain("alice", 1);
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 0.6));
        pool.push(Transaction::new("alice", "carol", 0.6));

        let (indices, admitted) = pool.admit(&chain);
        assert_eq!(indices, vec![0]);
        assert_eq!(admitted[0].recipient, "bob");
    }

    #[test]
    fn test_later_transaction_can_fill_gap() {
        // the rejected middle spend does not block the affordable last one
        let chain = funded_chain("alice", 1);
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 0.6));
        pool.push(Transaction::new("alice", "carol", 0.6));
        pool.push(Transaction::new("alice", "dave", 0.4));

        let (indices, admitted) = pool.admit(&chain);
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(admitted[1].recipient, "dave");
    }

    #[test]
    fn test_recipient_funds_usable_within_pass() {
        // bob can forward money he receives earlier in the same block
        let chain = funded_chain("alice", 1);
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 1.0));
        pool.push(Transaction::new("bob", "carol", 0.5));

        let (indices, _) = pool.admit(&chain);
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_prune_removes_exactly_admitted() {
        let chain = funded_chain("alice", 1);
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 0.6));
        pool.push(Transaction::new("alice", "carol", 0.6));

        let (indices, _) = pool.admit(&chain);
        pool.prune(&indices);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending()[0].recipient, "carol");
    }

    #[test]
    fn test_residual_would_still_overdraw() {
        // invariant: what remains after pruning is exactly what would
        // push a balance negative against the next chain state
        let mut chain = funded_chain("alice", 1);
        let mut pool = Mempool::new();
        pool.push(Transaction::new("alice", "bob", 0.6));
        pool.push(Transaction::new("alice", "carol", 0.6));

        let (indices, admitted) = pool.admit(&chain);
        pool.prune(&indices);

        // commit the admitted set plus a coinbase into the chain
        let mut transactions = admitted;
        transactions.push(Transaction::coinbase("miner"));
        chain.push(BlockEnvelope::seal(BlockBody {
            index: 2,
            difficulty: 1,
            nonce: 0,
            timestamp: "test".to_string(),
            transactions,
            previous_hash: "test".to_string(),
        }));

        let (indices_after, _) = pool.admit(&chain);
        assert!(indices_after.is_empty());
    }

    #[test]
    fn test_replace_drops_non_finite_and_minting() {
        let mut pool = Mempool::new();
        pool.replace(vec![
            Transaction::new("alice", "bob", 0.5),
            Transaction::new("alice", "bob", f64::INFINITY),
            Transaction::new("alice", "bob", f64::NAN),
            Transaction::new(COINBASE_SENDER, "mallory", 1000.0),
        ]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending()[0].amount, 0.5);
    }
}

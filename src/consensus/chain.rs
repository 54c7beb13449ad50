// Chain store and validator
//
// The chain is an in-memory vector of sealed block envelopes plus a
// running cumulative-effort counter. Effort, not length, is the
// consensus weight: a block at difficulty d is worth 16^(d-1), so a
// short high-difficulty chain outweighs a long low-difficulty one.

use crate::consensus::utxo;
use crate::crypto::hash::satisfies_difficulty;
use crate::primitives::block::BlockEnvelope;
use crate::primitives::transaction::COINBASE_SENDER;

/// Consensus weight of one block: 16^(difficulty-1).
pub fn block_effort(difficulty: u8) -> u64 {
    16u64.pow(difficulty.saturating_sub(1) as u32)
}

/// Total consensus weight of a chain.
pub fn chain_effort(blocks: &[BlockEnvelope]) -> u64 {
    blocks
        .iter()
        .map(|envelope| block_effort(envelope.block.difficulty))
        .sum()
}

/// Structural validation: hash linkage, hash correctness, and difficulty
/// satisfaction for every block, in order. Genesis's previous-hash field
/// is not checked against anything. Balance validity is a separate
/// concern (`non_negative_prefixes`).
pub fn valid_chain(blocks: &[BlockEnvelope]) -> bool {
    for (i, envelope) in blocks.iter().enumerate() {
        if i > 0 && envelope.block.previous_hash != blocks[i - 1].hash {
            return false;
        }
        if envelope.hash != envelope.block.hash() {
            return false;
        }
        if !satisfies_difficulty(&envelope.hash, envelope.block.difficulty) {
            return false;
        }
    }
    true
}

/// Replay the ledger block by block and require every non-coinbase
/// balance to be non-negative at each block boundary. Applied to peer
/// chains before adoption so a malicious peer cannot hand us a ledger
/// our own admission filter would never have produced.
pub fn non_negative_prefixes(blocks: &[BlockEnvelope]) -> bool {
    let mut balances = std::collections::BTreeMap::new();
    for envelope in blocks {
        for tx in &envelope.block.transactions {
            *balances.entry(tx.recipient.clone()).or_insert(0.0) += tx.amount;
            *balances.entry(tx.sender.clone()).or_insert(0.0) -= tx.amount;
        }
        let overdrawn = balances
            .iter()
            .any(|(addr, value)| addr != COINBASE_SENDER && utxo::round8(*value) < 0.0);
        if overdrawn {
            return false;
        }
    }
    true
}

/// The node's finalized blocks plus the cumulative-effort counter.
#[derive(Debug, Default)]
pub struct Chain {
    blocks: Vec<BlockEnvelope>,
    effort: u64,
}

impl Chain {
    pub fn new() -> Self {
        Chain::default()
    }

    pub fn blocks(&self) -> &[BlockEnvelope] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn effort(&self) -> u64 {
        self.effort
    }

    pub fn tip(&self) -> Option<&BlockEnvelope> {
        self.blocks.last()
    }

    /// Append a locally mined block and credit its effort.
    pub fn push(&mut self, envelope: BlockEnvelope) {
        self.effort += block_effort(envelope.block.difficulty);
        self.blocks.push(envelope);
    }

    /// Wholesale replacement by a peer's chain. Effort is recomputed
    /// from the blocks themselves, never taken from the peer's word.
    pub fn adopt(&mut self, blocks: Vec<BlockEnvelope>) {
        self.effort = chain_effort(&blocks);
        self.blocks = blocks;
    }
}

// Data Structures: Block
use serde::{Deserialize, Serialize};

use super::transaction::Transaction;
use crate::crypto::hash::hash_json;

/// The hashed portion of a block. The envelope hash is computed over the
/// canonical JSON of exactly these fields; it must never appear inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    /// 1 for genesis, strictly +1 per block
    pub index: u64,
    /// Leading zero hex digits required of this block's hash
    pub difficulty: u8,
    /// Solved by the miner. 64-bit with wrapping increments; the search
    /// starts from a random 31-bit value.
    pub nonce: u64,
    /// Human-readable Eastern wall-clock string; a fixed literal for genesis
    pub timestamp: String,
    /// Ordered transfers, ending with exactly one coinbase
    pub transactions: Vec<Transaction>,
    /// Hex hash of the previous body, or the genesis sentinel
    pub previous_hash: String,
}

impl BlockBody {
    /// Hex SHA-256 of this body's canonical JSON form.
    pub fn hash(&self) -> String {
        hash_json(self)
    }
}

/// A finalized block: the body plus its hash, as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEnvelope {
    pub block: BlockBody,
    pub hash: String,
}

impl BlockEnvelope {
    /// Seal a body whose nonce has been solved.
    pub fn seal(block: BlockBody) -> Self {
        let hash = block.hash();
        BlockEnvelope { block, hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> BlockBody {
        BlockBody {
            index: 1,
            difficulty: 2,
            nonce: 7,
            timestamp: "Jan 03, 2009 13:15:00 PM ET".to_string(),
            transactions: vec![Transaction::coinbase("satoshi")],
            previous_hash: "none".to_string(),
        }
    }

    #[test]
    fn test_seal_matches_body_hash() {
        let env = BlockEnvelope::seal(body());
        assert_eq!(env.hash, env.block.hash());
    }

    #[test]
    fn test_hash_covers_nonce() {
        let a = body();
        let mut b = body();
        b.nonce += 1;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_survives_wire_roundtrip() {
        let env = BlockEnvelope::seal(body());
        let raw = serde_json::to_string(&env).unwrap();
        let back: BlockEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.block.hash(), env.hash);
    }
}

// Data Structures: Transaction
use serde::{Deserialize, Serialize};

/// Sender address of every coinbase (mint) transaction. The coinbase
/// balance goes arbitrarily negative and is excluded from admission.
pub const COINBASE_SENDER: &str = "0";

/// Reward paid to the miner by the coinbase of each block
pub const BLOCK_REWARD: f64 = 1.0;

/// A value transfer between two opaque addresses. No signatures; anyone
/// may spend from any address. Amounts are rounded to 8 fractional
/// digits at balance-computation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// The mint transaction closing every block's transaction list.
    pub fn coinbase(miner: impl Into<String>) -> Self {
        Transaction::new(COINBASE_SENDER, miner, BLOCK_REWARD)
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }
}

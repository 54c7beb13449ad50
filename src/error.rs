use thiserror::Error;

use crate::config::{DIFFICULTY_MAX, DIFFICULTY_MIN};

/// Everything the node surfaces to callers. Network failures during a
/// consensus sweep are swallowed at the call site and never reach here.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("missing or malformed value: {0}")]
    BadRequest(String),

    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    #[error("peer chain failed validation")]
    InvalidChain,

    #[error("a mining pass is already running")]
    MiningBusy,

    #[error("chain tip moved during mining; block discarded")]
    StaleMine,

    #[error("difficulty must be between {DIFFICULTY_MIN} and {DIFFICULTY_MAX}")]
    ConfigOutOfRange,
}

// Genesis block definition
//
// The genesis block is mined for real at node startup (the default
// difficulty makes this instant) rather than shipped pre-solved. Its
// previous-hash field carries a sentinel string because there is no
// block before it, and its coinbase pays a fixed historical recipient
// instead of the local node.

/// Stand-in for the nonexistent parent of the first block
pub const GENESIS_PREVIOUS_HASH: &str =
    "[note: previous hash is not applicable in the case of genesis block]";

/// Fixed historical timestamp recorded in the genesis body
pub const GENESIS_TIMESTAMP: &str = "Jan 03, 2009 13:15:00 PM ET";

/// Recipient of the genesis coinbase, on every node
pub const GENESIS_RECIPIENT: &str = "satoshi";

/// Chain indices start at 1
pub const GENESIS_INDEX: u64 = 1;

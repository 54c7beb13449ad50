use std::time::Duration;

/// Default RPC port when no positional argument is given
pub const DEFAULT_RPC_PORT: u16 = 5000;

/// Bind address for RPC — 0.0.0.0 so peers and dashboards can reach us
pub const RPC_BIND_ADDRESS: &str = "0.0.0.0";

/// Mining difficulty bounds (leading zero hex digits of a block hash)
pub const DIFFICULTY_MIN: u8 = 1;
pub const DIFFICULTY_MAX: u8 = 5;
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Bound on every peer HTTP call; a peer slower than this is skipped
pub const PEER_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Node ids are 16 random bytes rendered as 32 hex characters
pub const NODE_ID_BYTES: usize = 16;

pub struct NodeConfig {
    pub port: u16,
    pub node_id: String,
}

impl NodeConfig {
    /// Parse positional startup arguments: `[port] [node_id]`.
    pub fn from_args<I>(mut args: I) -> Result<Self, String>
    where
        I: Iterator<Item = String>,
    {
        let port = match args.next() {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {raw}"))?,
            None => DEFAULT_RPC_PORT,
        };
        let node_id = args.next().unwrap_or_else(random_node_id);
        if let Some(extra) = args.next() {
            return Err(format!("unexpected argument: {extra}"));
        }
        Ok(NodeConfig { port, node_id })
    }
}

/// Fresh random node identifier, 32 hex characters.
pub fn random_node_id() -> String {
    let bytes: Vec<u8> = (0..NODE_ID_BYTES).map(|_| rand::random::<u8>()).collect();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_args() {
        let cfg = NodeConfig::from_args(std::iter::empty()).unwrap();
        assert_eq!(cfg.port, DEFAULT_RPC_PORT);
        assert_eq!(cfg.node_id.len(), NODE_ID_BYTES * 2);
    }

    #[test]
    fn test_positional_args() {
        let args = ["5001".to_string(), "alice".to_string()];
        let cfg = NodeConfig::from_args(args.into_iter()).unwrap();
        assert_eq!(cfg.port, 5001);
        assert_eq!(cfg.node_id, "alice");
    }

    #[test]
    fn test_bad_port_rejected() {
        let args = ["not-a-port".to_string()];
        assert!(NodeConfig::from_args(args.into_iter()).is_err());
    }

    #[test]
    fn test_extra_args_rejected() {
        let args = ["5001", "alice", "surplus"].map(String::from);
        assert!(NodeConfig::from_args(args.into_iter()).is_err());
    }

    #[test]
    fn test_node_ids_are_unique() {
        assert_ne!(random_node_id(), random_node_id());
    }
}

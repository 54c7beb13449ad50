// Peer registry and HTTP peer client
//
// Peers are tracked as node_id -> host:port. Registration contacts the
// peer's /id once; a peer that does not answer is not stored. All peer
// calls share one reqwest client with a bounded timeout, and callers
// treat every failure as "skip this peer, keep sweeping".

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::NodeError;
use crate::primitives::block::BlockEnvelope;
use crate::primitives::transaction::Transaction;

#[derive(Debug, Default)]
pub struct PeerRegistry {
    nodes: HashMap<String, String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        PeerRegistry::default()
    }

    pub fn insert(&mut self, node_id: String, address: String) {
        self.nodes.insert(node_id, address);
    }

    pub fn ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.nodes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reduce a peer URL to `host[:port]`. The scheme is optional;
/// `http://10.0.0.5:5001`, `10.0.0.5:5001` and `example.com` all work.
pub fn parse_peer_addr(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let url = reqwest::Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct IdPayload {
    node_id: String,
}

/// A peer's `/chain` response. The advertised effort is carried for
/// logging only; adoption recomputes effort from the blocks.
#[derive(Debug, Deserialize)]
pub struct RemoteChain {
    pub chain: Vec<BlockEnvelope>,
    pub effort: u64,
}

#[derive(Debug, Deserialize)]
struct PendingPayload {
    pending_transactions: Vec<Transaction>,
}

fn unavailable(addr: &str, err: impl std::fmt::Display) -> NodeError {
    NodeError::PeerUnavailable(format!("{addr}: {err}"))
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    addr: &str,
    path: &str,
) -> Result<T, NodeError> {
    let response = client
        .get(format!("http://{addr}{path}"))
        .send()
        .await
        .map_err(|e| unavailable(addr, e))?;
    if !response.status().is_success() {
        return Err(unavailable(addr, response.status()));
    }
    response.json::<T>().await.map_err(|e| unavailable(addr, e))
}

/// Ask a peer who it is. Used once at registration time.
pub async fn fetch_node_id(client: &reqwest::Client, addr: &str) -> Result<String, NodeError> {
    let payload: IdPayload = get_json(client, addr, "/id").await?;
    Ok(payload.node_id)
}

/// Fetch a peer's full chain and advertised effort.
pub async fn fetch_chain(client: &reqwest::Client, addr: &str) -> Result<RemoteChain, NodeError> {
    get_json(client, addr, "/chain").await
}

/// Fetch a peer's pending transaction list.
pub async fn fetch_pending(
    client: &reqwest::Client,
    addr: &str,
) -> Result<Vec<Transaction>, NodeError> {
    let payload: PendingPayload = get_json(client, addr, "/transactions/pending").await?;
    Ok(payload.pending_transactions)
}

/// Hand a transaction to a peer's own mempool.
pub async fn push_transaction(
    client: &reqwest::Client,
    addr: &str,
    tx: &Transaction,
) -> Result<(), NodeError> {
    let response = client
        .post(format!("http://{addr}/transactions/new"))
        .json(tx)
        .send()
        .await
        .map_err(|e| unavailable(addr, e))?;
    if !response.status().is_success() {
        return Err(unavailable(addr, response.status()));
    }
    Ok(())
}

/// Tell a peer to mine its future blocks at `difficulty`.
pub async fn push_difficulty(
    client: &reqwest::Client,
    addr: &str,
    difficulty: u8,
) -> Result<(), NodeError> {
    let response = client
        .get(format!("http://{addr}/difficulty/update?difficulty={difficulty}"))
        .send()
        .await
        .map_err(|e| unavailable(addr, e))?;
    if !response.status().is_success() {
        return Err(unavailable(addr, response.status()));
    }
    Ok(())
}

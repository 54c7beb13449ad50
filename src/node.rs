// Node state and operations
//
// One NodeState value owns everything the RPC facade exposes: the
// chain, the mempool, the node's mining difficulty, and the peer
// registry. Mutating operations serialize through the ledger write
// lock; reads take consistent snapshots. The nonce search and all peer
// HTTP traffic run outside every lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::config::{DIFFICULTY_MAX, DIFFICULTY_MIN, PEER_HTTP_TIMEOUT};
use crate::consensus::chain::{self, Chain};
use crate::consensus::genesis::{GENESIS_PREVIOUS_HASH, GENESIS_RECIPIENT, GENESIS_TIMESTAMP};
use crate::consensus::utxo;
use crate::error::NodeError;
use crate::miner::miner;
use crate::net::mempool::Mempool;
use crate::net::peers::{self, PeerRegistry};
use crate::primitives::block::{BlockBody, BlockEnvelope};
use crate::primitives::transaction::{Transaction, COINBASE_SENDER};

/// Chain, mempool and difficulty move together under one lock so every
/// reader sees a consistent cut of the node.
struct Ledger {
    chain: Chain,
    mempool: Mempool,
    difficulty: u8,
}

/// What `/mine` reports back about a freshly forged block.
pub struct MineOutcome {
    pub index: u64,
    pub difficulty: u8,
}

/// Read-only cut of the chain for `/chain` responses.
pub struct ChainSnapshot {
    pub blocks: Vec<BlockEnvelope>,
    pub effort: u64,
}

pub struct NodeState {
    pub node_id: String,
    ledger: RwLock<Ledger>,
    peers: RwLock<PeerRegistry>,
    mining: AtomicBool,
    http: reqwest::Client,
}

impl NodeState {
    pub fn new(node_id: String, difficulty: u8) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(PEER_HTTP_TIMEOUT)
            .build()?;
        Ok(NodeState {
            node_id,
            ledger: RwLock::new(Ledger {
                chain: Chain::new(),
                mempool: Mempool::new(),
                difficulty,
            }),
            peers: RwLock::new(PeerRegistry::new()),
            mining: AtomicBool::new(false),
            http,
        })
    }

    /// Queue a transfer for the next mining pass. Validation here is
    /// shape-only; balance checks happen at admission time.
    pub async fn new_transaction(
        &self,
        sender: String,
        recipient: String,
        amount: f64,
    ) -> Result<Transaction, NodeError> {
        if !amount.is_finite() {
            return Err(NodeError::BadRequest("amount must be finite".to_string()));
        }
        // only mining passes mint; the mint source is exempt from the
        // balance check and would otherwise be free money
        if sender == COINBASE_SENDER {
            return Err(NodeError::BadRequest(
                "the coinbase source cannot be used as a sender".to_string(),
            ));
        }
        let tx = Transaction::new(sender, recipient, amount);
        self.ledger.write().await.mempool.push(tx.clone());
        Ok(tx)
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.read().await.mempool.pending().to_vec()
    }

    pub async fn chain_snapshot(&self) -> ChainSnapshot {
        let ledger = self.ledger.read().await;
        ChainSnapshot {
            blocks: ledger.chain.blocks().to_vec(),
            effort: ledger.chain.effort(),
        }
    }

    pub async fn balances(&self) -> BTreeMap<String, f64> {
        let ledger = self.ledger.read().await;
        utxo::utxo(ledger.chain.blocks())
    }

    pub async fn difficulty(&self) -> u8 {
        self.ledger.read().await.difficulty
    }

    /// Set the difficulty future blocks will be mined at. Historical
    /// blocks keep the difficulty they were mined with.
    pub async fn set_difficulty(&self, difficulty: u8) -> Result<u8, NodeError> {
        if !(DIFFICULTY_MIN..=DIFFICULTY_MAX).contains(&difficulty) {
            return Err(NodeError::ConfigOutOfRange);
        }
        self.ledger.write().await.difficulty = difficulty;
        Ok(difficulty)
    }

    /// One full mining pass: admit, search, commit. At most one pass
    /// runs at a time; a concurrent caller fails fast with MiningBusy
    /// because two passes would admit the same transactions twice.
    pub async fn mine(&self) -> Result<MineOutcome, NodeError> {
        if self
            .mining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(NodeError::MiningBusy);
        }
        let result = self.mine_pass().await;
        self.mining.store(false, Ordering::SeqCst);
        result
    }

    async fn mine_pass(&self) -> Result<MineOutcome, NodeError> {
        // Admitting: freeze the admitted set and build the template
        // under a read lock. An empty chain means this is the genesis
        // pass: sentinel parent, fixed timestamp, fixed recipient.
        let (body, admitted_indices) = {
            let ledger = self.ledger.read().await;
            let genesis = ledger.chain.is_empty();

            let (indices, mut transactions) = ledger.mempool.admit(ledger.chain.blocks());
            let recipient = if genesis {
                GENESIS_RECIPIENT.to_string()
            } else {
                self.node_id.clone()
            };
            transactions.push(Transaction::coinbase(recipient));

            let body = BlockBody {
                index: ledger.chain.len() as u64 + 1,
                difficulty: ledger.difficulty,
                nonce: 0,
                timestamp: if genesis {
                    GENESIS_TIMESTAMP.to_string()
                } else {
                    miner::eastern_now()
                },
                transactions,
                previous_hash: match ledger.chain.tip() {
                    Some(tip) => tip.hash.clone(),
                    None => GENESIS_PREVIOUS_HASH.to_string(),
                },
            };
            (body, indices)
        };

        // Searching: unbounded CPU loop, off the async workers and
        // outside every lock so read-only RPCs keep flowing.
        let solved = tokio::task::spawn_blocking(move || miner::search(body))
            .await
            .expect("nonce search task must not panic");

        // Committing: splice the block in, unless a chain adoption won
        // the race and moved the tip out from under us.
        let mut ledger = self.ledger.write().await;
        let tip_hash = ledger
            .chain
            .tip()
            .map(|tip| tip.hash.as_str())
            .unwrap_or(GENESIS_PREVIOUS_HASH);
        if solved.block.previous_hash != tip_hash {
            return Err(NodeError::StaleMine);
        }

        // A freshly mined block failing re-verification means canonical
        // serialization is broken; this node must stop forging.
        assert_eq!(
            solved.hash,
            solved.block.hash(),
            "own block failed hash re-verification"
        );

        let outcome = MineOutcome {
            index: solved.block.index,
            difficulty: solved.block.difficulty,
        };
        ledger.chain.push(solved);
        ledger.mempool.prune(&admitted_indices);
        Ok(outcome)
    }

    /// Resolve the given URLs to node ids and remember them. Peers that
    /// cannot be reached are skipped, not stored. Returns the ids of
    /// every known peer afterwards.
    pub async fn register_nodes(&self, urls: &[String]) -> Vec<String> {
        for raw in urls {
            let addr = match peers::parse_peer_addr(raw) {
                Some(addr) => addr,
                None => {
                    eprintln!("[peers] unparseable node address: {raw}");
                    continue;
                }
            };
            match peers::fetch_node_id(&self.http, &addr).await {
                Ok(node_id) => {
                    self.peers.write().await.insert(node_id, addr);
                }
                Err(err) => eprintln!("[peers] registration skipped: {err}"),
            }
        }
        self.peers.read().await.ids()
    }

    /// The consensus sweep. Poll every registered peer's chain; adopt
    /// the heaviest one that is strictly heavier than ours and passes
    /// full validation. Effort is recomputed from the fetched blocks,
    /// so a peer cannot win by advertising an inflated number. Returns
    /// whether an adoption happened.
    pub async fn resolve_conflicts(&self) -> bool {
        let addresses = self.peers.read().await.addresses();
        let local_effort = self.ledger.read().await.chain.effort();

        let mut max_effort = local_effort;
        let mut best: Option<(String, Vec<BlockEnvelope>)> = None;

        for addr in addresses {
            let remote = match peers::fetch_chain(&self.http, &addr).await {
                Ok(remote) => remote,
                Err(err) => {
                    eprintln!("[peers] sweep skipped a peer: {err}");
                    continue;
                }
            };

            let effort = chain::chain_effort(&remote.chain);
            if remote.effort != effort {
                eprintln!(
                    "[peers] {addr} advertised effort {} but its blocks carry {effort}",
                    remote.effort
                );
            }
            if effort <= max_effort {
                continue;
            }
            if !chain::valid_chain(&remote.chain) || !chain::non_negative_prefixes(&remote.chain) {
                eprintln!("[peers] {addr} skipped: {}", NodeError::InvalidChain);
                continue;
            }

            max_effort = effort;
            best = Some((addr, remote.chain));
        }

        let (addr, blocks) = match best {
            Some(found) => found,
            None => return false,
        };

        // Take over the winner's pending set as well; if that fetch
        // fails we keep our own mempool rather than dropping it.
        let pending = peers::fetch_pending(&self.http, &addr).await.ok();

        let mut ledger = self.ledger.write().await;
        ledger.chain.adopt(blocks);
        if let Some(pending) = pending {
            ledger.mempool.replace(pending);
        }
        true
    }

    /// Fan a transaction out to every registered peer's mempool.
    pub async fn broadcast_transaction(&self, tx: &Transaction) {
        let addresses = self.peers.read().await.addresses();
        for addr in addresses {
            if let Err(err) = peers::push_transaction(&self.http, &addr, tx).await {
                eprintln!("[peers] transaction broadcast skipped a peer: {err}");
            }
        }
    }

    /// Fan a difficulty update out to every registered peer.
    pub async fn broadcast_difficulty(&self, difficulty: u8) {
        let addresses = self.peers.read().await.addresses();
        for addr in addresses {
            if let Err(err) = peers::push_difficulty(&self.http, &addr, difficulty).await {
                eprintln!("[peers] difficulty broadcast skipped a peer: {err}");
            }
        }
    }
}

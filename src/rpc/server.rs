// HTTP facade
//
// Thin REST routing over NodeState: every handler is a straight call
// into a node operation plus a JSON rendering of the result. Responses
// carry permissive CORS headers so browser dashboards on other origins
// can poll any node directly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::RPC_BIND_ADDRESS;
use crate::error::NodeError;
use crate::node::NodeState;
use crate::primitives::transaction::Transaction;

fn json_response(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(&body).expect("response serialization must not fail");
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
        .header("Access-Control-Allow-Methods", "GET,PUT,POST,DELETE,OPTIONS")
        .body(Full::new(Bytes::from(bytes)))
        .expect("static response headers are valid")
}

fn bad_request(message: impl std::fmt::Display) -> Response<Full<Bytes>> {
    json_response(StatusCode::BAD_REQUEST, json!({ "message": message.to_string() }))
}

/// Pull one key out of a raw query string.
fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key {
            Some(v.to_string())
        } else {
            None
        }
    })
}

async fn read_json<T: for<'de> Deserialize<'de>>(req: Request<Incoming>) -> Result<T, NodeError> {
    let body = req
        .collect()
        .await
        .map_err(|_| NodeError::BadRequest("unreadable request body".to_string()))?
        .to_bytes();
    serde_json::from_slice(&body).map_err(|e| NodeError::BadRequest(e.to_string()))
}

#[derive(Deserialize)]
struct RegisterPayload {
    nodes: Option<Vec<String>>,
}

async fn handle_mine(state: &NodeState) -> Response<Full<Bytes>> {
    match state.mine().await {
        Ok(outcome) => json_response(
            StatusCode::OK,
            json!({
                "message": "new block forged",
                "block #": outcome.index,
                "difficulty": outcome.difficulty,
                "node_id": state.node_id,
            }),
        ),
        Err(NodeError::MiningBusy) => json_response(
            StatusCode::CONFLICT,
            json!({
                "message": "a mining pass is already running",
                "node_id": state.node_id,
            }),
        ),
        Err(NodeError::StaleMine) => json_response(
            StatusCode::OK,
            json!({
                "message": "chain was replaced while mining; no block appended",
                "node_id": state.node_id,
            }),
        ),
        Err(err) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": err.to_string(), "node_id": state.node_id }),
        ),
    }
}

async fn handle_new_transaction(
    state: &NodeState,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let tx: Transaction = match read_json(req).await {
        Ok(tx) => tx,
        Err(err) => return bad_request(err),
    };
    match state
        .new_transaction(tx.sender, tx.recipient, tx.amount)
        .await
    {
        Ok(tx) => json_response(
            StatusCode::OK,
            json!({
                "message": "transaction will be added to the next block after validation",
                "transaction": tx,
                "node_id": state.node_id,
            }),
        ),
        Err(err) => bad_request(err),
    }
}

async fn handle_broadcast_transaction(
    state: &NodeState,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let tx: Transaction = match read_json(req).await {
        Ok(tx) => tx,
        Err(err) => return bad_request(err),
    };
    if !tx.amount.is_finite() {
        return bad_request("amount must be finite");
    }
    state.broadcast_transaction(&tx).await;
    json_response(
        StatusCode::OK,
        json!({
            "message": "transaction has been broadcasted to the network \
                        and will be added to the next block after validation",
            "transaction": tx,
            "node_id": state.node_id,
        }),
    )
}

async fn handle_register_nodes(
    state: &NodeState,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let payload: RegisterPayload = match read_json(req).await {
        Ok(payload) => payload,
        Err(err) => return bad_request(err),
    };
    let nodes = payload.nodes.unwrap_or_default();
    let message = if nodes.is_empty() {
        "all available nodes"
    } else {
        "new nodes added"
    };
    let all_nodes = state.register_nodes(&nodes).await;
    json_response(
        StatusCode::OK,
        json!({
            "message": message,
            "all_nodes": all_nodes,
            "node_id": state.node_id,
        }),
    )
}

async fn handle_resolve(state: &NodeState) -> Response<Full<Bytes>> {
    let replaced = state.resolve_conflicts().await;
    let message = if replaced {
        "our chain and pending transactions have been replaced"
    } else {
        "our chain is authoritative"
    };
    json_response(
        StatusCode::OK,
        json!({ "message": message, "node_id": state.node_id }),
    )
}

async fn handle_difficulty_update(
    state: &NodeState,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let raw = match query_param(query, "difficulty") {
        Some(raw) => raw,
        None => {
            return json_response(
                StatusCode::OK,
                json!({
                    "message": "current difficulty",
                    "difficulty": state.difficulty().await,
                    "node_id": state.node_id,
                }),
            );
        }
    };
    let difficulty: u8 = match raw.parse() {
        Ok(d) => d,
        Err(_) => return bad_request(format!("invalid difficulty: {raw}")),
    };
    match state.set_difficulty(difficulty).await {
        Ok(d) => json_response(
            StatusCode::OK,
            json!({
                "message": "difficulty has been updated",
                "difficulty": d,
                "node_id": state.node_id,
            }),
        ),
        // out of range: report and leave the current value standing
        Err(err) => json_response(
            StatusCode::OK,
            json!({
                "message": err.to_string(),
                "difficulty": state.difficulty().await,
                "node_id": state.node_id,
            }),
        ),
    }
}

async fn handle_difficulty_broadcast(
    state: &NodeState,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let raw = match query_param(query, "difficulty") {
        Some(raw) => raw,
        None => return bad_request("difficulty query parameter is required"),
    };
    let difficulty: u8 = match raw.parse() {
        Ok(d) => d,
        Err(_) => return bad_request(format!("invalid difficulty: {raw}")),
    };
    state.broadcast_difficulty(difficulty).await;
    json_response(
        StatusCode::OK,
        json!({
            "message": "difficulty has been broadcasted to the network",
            "difficulty": difficulty,
            "node_id": state.node_id,
        }),
    )
}

async fn handle_request(
    state: Arc<NodeState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() == Method::OPTIONS {
        return Ok(json_response(StatusCode::OK, json!({})));
    }

    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    let response = match (req.method().clone(), path.as_str()) {
        (Method::GET, "/id") => {
            json_response(StatusCode::OK, json!({ "node_id": state.node_id }))
        }
        (Method::GET, "/mine") => handle_mine(&state).await,
        (Method::POST, "/transactions/new") => handle_new_transaction(&state, req).await,
        (Method::POST, "/transactions/broadcast") => {
            handle_broadcast_transaction(&state, req).await
        }
        (Method::GET, "/transactions/pending") => json_response(
            StatusCode::OK,
            json!({
                "message": "pending transactions",
                "pending_transactions": state.pending_transactions().await,
                "node_id": state.node_id,
            }),
        ),
        (Method::GET, "/chain") => {
            let snapshot = state.chain_snapshot().await;
            json_response(
                StatusCode::OK,
                json!({
                    "chain": snapshot.blocks,
                    "length": snapshot.blocks.len(),
                    "effort": snapshot.effort,
                    "node_id": state.node_id,
                }),
            )
        }
        (Method::GET, "/utxo") => json_response(
            StatusCode::OK,
            json!({
                "balances": state.balances().await,
                "node_id": state.node_id,
            }),
        ),
        (Method::POST, "/nodes/register") => handle_register_nodes(&state, req).await,
        (Method::GET, "/nodes/resolve") => handle_resolve(&state).await,
        (Method::GET, "/difficulty/update") => {
            handle_difficulty_update(&state, query.as_deref()).await
        }
        (Method::GET, "/difficulty/broadcast") => {
            handle_difficulty_broadcast(&state, query.as_deref()).await
        }
        _ => json_response(StatusCode::NOT_FOUND, json!({ "message": "not found" })),
    };

    Ok(response)
}

pub async fn start_rpc_server(
    state: Arc<NodeState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{RPC_BIND_ADDRESS}:{port}").parse()?;
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { handle_request(state, req).await }
            });
            let _ = hyper::server::conn::http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await;
        });
    }
}

use crate::{caller_host, constants::COINS_UNIT, error::ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use ledger_core::{
    chain::mine_block, mine::mine_block_parallel, pow::CancelFlag, Block, LedgerError,
    SealResult, Transaction,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    to_address: String,
    amount: i64,
}

#[derive(Deserialize)]
pub struct CoinsQuery {
    address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Coins {
    pub address: String,
    pub balance: i64,
    pub message: String,
}

#[derive(Deserialize)]
pub struct PeerIn {
    address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeersOut {
    pub added: bool,
    pub peers: Vec<String>,
}

/// Cancels the search if the request future is dropped mid-flight.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Mine against the current tip off the async runtime, then pay the caller
/// and seal under the ledger lock.
pub async fn mine(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SealResult>, ApiError> {
    let miner = caller_host(&headers).ok_or(ApiError::MissingHost)?;
    let (tip, difficulty) = {
        let ledger = state.ledger();
        let tip = ledger
            .last_block()
            .cloned()
            .ok_or_else(|| ApiError::Internal("ledger has no blocks".into()))?;
        (tip, ledger.config().difficulty)
    };

    let options = state.mining();
    // Dropping the guard, including on timeout, stops the blocking search.
    let guard = CancelOnDrop(state.shutdown().child());
    let cancel = guard.0.clone();
    let search = tokio::task::spawn_blocking(move || {
        if options.parallel {
            mine_block_parallel(&tip, difficulty, &cancel)
        } else {
            mine_block(&tip, difficulty, &cancel)
        }
    });
    let joined = match options.timeout {
        Some(timeout) => tokio::time::timeout(timeout, search).await.map_err(|_| {
            warn!(?timeout, "mining timed out");
            ApiError::MiningCancelled
        })?,
        None => search.await,
    };
    let candidate = joined
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::MiningCancelled)?;
    drop(guard);

    let sealed = state.ledger().seal_candidate(candidate, Some(miner.as_str()))?;
    info!(index = sealed.block.index, %miner, "sealed block for miner");
    Ok(Json(sealed))
}

pub async fn last_block(State(state): State<AppState>) -> Json<Option<Block>> {
    Json(state.ledger().last_block().cloned())
}

pub async fn chain(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.ledger().chain().to_vec())
}

/// Stage a transfer from the caller to `toAddress`.
pub async fn add_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TxIn>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Json(tx) =
        payload.map_err(|rejection| LedgerError::InvalidTransaction(rejection.body_text()))?;
    let from = caller_host(&headers).ok_or(ApiError::MissingHost)?;
    let tx = state
        .ledger()
        .add_transaction(&tx.to_address, tx.amount, Some(from.as_str()))?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn coins(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CoinsQuery>,
) -> Result<Json<Coins>, ApiError> {
    let address = query
        .address
        .or_else(|| caller_host(&headers))
        .ok_or(ApiError::MissingHost)?;
    let balance = state.ledger().balance_of(&address);
    Ok(Json(Coins {
        message: format!("You have {balance} {COINS_UNIT}"),
        address,
        balance,
    }))
}

pub async fn peers(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.peers().peers().to_vec())
}

pub async fn add_peer(
    State(state): State<AppState>,
    payload: Result<Json<PeerIn>, JsonRejection>,
) -> Result<Json<PeersOut>, ApiError> {
    let Json(peer) = payload?;
    let mut peers = state.peers();
    let added = peers.add_peer(peer.address);
    Ok(Json(PeersOut {
        added,
        peers: peers.peers().to_vec(),
    }))
}

//! HTTP front for a single in-process ledger.

pub mod constants;
pub mod error;
pub mod handlers;

use axum::{
    extract::{Request, State},
    http::{header::HOST, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use ledger_core::{pow::CancelFlag, Ledger, LedgerConfig, PeerRegistry};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

/// How the `/mine` route runs its search.
#[derive(Clone, Copy, Debug, Default)]
pub struct MiningOptions {
    /// Spread attempts over the rayon pool instead of one blocking thread.
    pub parallel: bool,
    /// Cancel a search that runs longer than this.
    pub timeout: Option<Duration>,
}

/// Composition root shared by every handler. The ledger and the peer
/// registry each sit behind their own lock; mining runs outside both.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Mutex<Ledger>>,
    peers: Arc<Mutex<PeerRegistry>>,
    mining: MiningOptions,
    shutdown: CancelFlag,
}

impl AppState {
    pub fn new(config: LedgerConfig, mining: MiningOptions) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(Ledger::with_config(config))),
            peers: Arc::new(Mutex::new(PeerRegistry::new())),
            mining,
            shutdown: CancelFlag::new(),
        }
    }

    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn peers(&self) -> MutexGuard<'_, PeerRegistry> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mining(&self) -> MiningOptions {
        self.mining
    }

    /// Parent flag for every mining search; cancelling it stops them all.
    pub fn shutdown(&self) -> &CancelFlag {
        &self.shutdown
    }
}

/// The caller's `Host` header, used as its raw address.
pub fn caller_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_owned)
}

async fn track_peer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(host) = caller_host(request.headers()) {
        if state.peers().add_peer(host.clone()) {
            debug!(%host, "new peer");
        }
    }
    next.run(request).await
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::last_block))
        .route("/health", get(handlers::health))
        .route("/mine", get(handlers::mine))
        .route("/last_block", get(handlers::last_block))
        .route("/chain", get(handlers::chain))
        .route("/transaction", post(handlers::add_transaction))
        .route("/coins", get(handlers::coins))
        .route("/peers", get(handlers::peers).post(handlers::add_peer))
        .layer(middleware::from_fn_with_state(state.clone(), track_peer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use crate::bridge::run_pairing;
use crate::config::RelayConfig;
use crate::error::RelayResult;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state. Pairings share nothing but these counters.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    next_pairing: Arc<AtomicU64>,
    active: Arc<AtomicUsize>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config: Arc::new(config),
            next_pairing: Arc::new(AtomicU64::new(1)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active_pairings(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(handle_websocket))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Handle WebSocket upgrade
pub async fn handle_websocket(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let id = state.next_pairing.fetch_add(1, Ordering::Relaxed);
        let upstream = state.config.upstream_addr.clone();
        let active = state.active.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Pairing {} opened ({} active)", id, active);

        match run_pairing(socket, &upstream, state.config.connect_timeout).await {
            Ok(summary) => info!(
                "Pairing {} closed by {:?}: {} bytes up, {} bytes down",
                id, summary.closed_by, summary.bytes_to_upstream, summary.bytes_to_client
            ),
            Err(e) => warn!("Pairing {} failed: {}", id, e),
        }

        state.active.fetch_sub(1, Ordering::Relaxed);
    })
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, config: RelayConfig, shutdown: F) -> RelayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Relaying ws://{} to tcp://{}", addr, config.upstream_addr);
    }

    axum::serve(listener, router(RelayState::new(config)))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

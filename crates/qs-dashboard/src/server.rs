//! HTTP server implementation using axum.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use qs_core::{ConnectionStatus, HistoryPoint, NewsItem};
use qs_telemetry::Metrics;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::state::DashboardState;
use crate::types::{DashboardMessage, DashboardSnapshot};

/// Caps concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Reserve a slot. The slot is released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                Metrics::dashboard_client_connected();
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

/// Owned slot in a `ConnectionLimiter`; moves into the upgraded socket task.
pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
        Metrics::dashboard_client_disconnected();
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(
        dashboard_state: DashboardState,
        broadcast_tx: broadcast::Sender<String>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            dashboard_state,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/history/{symbol}", get(get_history))
        .route("/api/news", get(get_news))
        .route("/api/status", get(get_status))
        .route("/metrics", get(get_metrics))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Get current state snapshot as JSON.
async fn get_snapshot(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.dashboard_state.collect_snapshot())
}

/// Get the history series for one symbol.
async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Vec<HistoryPoint>>, StatusCode> {
    state
        .dashboard_state
        .history(&symbol)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_news(State(state): State<AppState>) -> Json<Vec<NewsItem>> {
    Json(state.dashboard_state.news())
}

async fn get_status(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(state.dashboard_state.status())
}

/// Prometheus text exposition.
async fn get_metrics() -> Response {
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!(
                current = state.connection_limiter.current_count(),
                max = state.config.max_connections,
                "WebSocket connection limit reached"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "Dashboard client connected"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Serve one dashboard client: a full snapshot, then every broadcast update
/// until either side goes away.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    // Subscribe first so updates taken during the snapshot are queued.
    let updates = state.broadcast_tx.subscribe();
    let (mut sink, mut stream) = socket.split();

    let snapshot = DashboardMessage::Snapshot(state.dashboard_state.collect_snapshot());
    let delivered = match serde_json::to_string(&snapshot) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize dashboard snapshot");
            false
        }
    };

    if delivered {
        let mut forward = tokio::spawn(forward_updates(sink, updates));
        loop {
            tokio::select! {
                _ = &mut forward => break,
                frame = stream.next() => match frame {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "Dashboard client read failed");
                        break;
                    }
                    // Pings are answered by axum; other frames are ignored.
                    Some(Ok(_)) => {}
                },
            }
        }
        forward.abort();
    }

    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "Dashboard client disconnected"
    );
}

/// Push broadcast updates to one client until it stops accepting them.
async fn forward_updates(
    mut sink: SplitSink<WebSocket, Message>,
    mut updates: broadcast::Receiver<String>,
) {
    loop {
        let json = match updates.recv().await {
            Ok(json) => json,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Dashboard client fell behind, dropping updates");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        if sink.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }
}

/// Run the dashboard HTTP server until `shutdown` resolves.
pub async fn run_server<F>(
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: F,
) -> DashboardResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (broadcast_tx, _) = broadcast::channel::<String>(config.broadcast_capacity.max(1));

    let state = AppState::new(dashboard_state.clone(), broadcast_tx.clone(), config.clone());
    let app = create_router(state);

    let broadcaster = tokio::spawn(crate::broadcast::run_broadcaster(
        dashboard_state,
        broadcast_tx,
        config.update_interval(),
    ));

    let addr = config.socket_addr();
    info!(%addr, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| DashboardError::Bind { addr, source })?;
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    broadcaster.abort();
    info!("Dashboard server stopped");
    result.map_err(DashboardError::from)
}

//! # HTTP Listener
//!
//! One axum router on `WS_PORT`:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /ws` | Live event stream (WebSocket upgrade) |
//! | `GET /health` | Store health and live connection count |
//! | `GET /metrics` | Prometheus text exposition |
//! | `GET /events/recent?size=N` | Newest stored events, `N` in `1..=1000` |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ev_01_store_writer::{BulkStore, StoreWriter};
use ev_02_broadcast_hub::{upgrade, BroadcastHub};
use serde::Deserialize;
use serde_json::json;
use stream_telemetry::{encode_metrics, STORE_SEARCH_DURATION};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

pub const DEFAULT_RECENT_SIZE: usize = 50;
pub const MAX_RECENT_SIZE: usize = 1000;

/// State shared by all handlers.
pub struct AppState<S: BulkStore + 'static> {
    pub writer: Arc<StoreWriter<S>>,
    pub hub: Arc<BroadcastHub>,
}

impl<S: BulkStore + 'static> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            hub: Arc::clone(&self.hub),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub size: Option<usize>,
}

/// Requested size, clamped to `1..=MAX_RECENT_SIZE`.
pub fn clamp_size(size: Option<usize>) -> usize {
    size.unwrap_or(DEFAULT_RECENT_SIZE).clamp(1, MAX_RECENT_SIZE)
}

pub fn router<S: BulkStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/ws", get(live_stream::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(metrics))
        .route("/events/recent", get(recent_events::<S>))
        .with_state(state)
}

async fn live_stream<S: BulkStore + 'static>(
    State(state): State<AppState<S>>,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(ws, Arc::clone(&state.hub))
}

async fn health<S: BulkStore + 'static>(State(state): State<AppState<S>>) -> Response {
    let store_healthy = state.writer.health_check().await;
    let status = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if store_healthy { "ok" } else { "degraded" },
        "store": { "healthy": store_healthy, "index": state.writer.index() },
        "live": { "connections": state.hub.connection_count() },
    });
    (status, Json(body)).into_response()
}

async fn metrics() -> Response {
    match encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn recent_events<S: BulkStore + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<RecentParams>,
) -> Response {
    let size = clamp_size(params.size);
    let _timer = stream_telemetry::time_histogram!(STORE_SEARCH_DURATION);

    match state.writer.search(json!({ "match_all": {} }), size).await {
        Ok(events) => Json(json!({ "count": events.len(), "events": events })).into_response(),
        Err(e) => {
            warn!(error = %e, size, "Recent events query failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Serve `router` on `listener` until `shutdown_rx` flips.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?addr, "HTTP listener started");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;
    info!("HTTP listener stopped");
    Ok(())
}

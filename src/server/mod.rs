//! HTTP front door.
//!
//! Provides three endpoints:
//! - `/proxy/score` - Admits a scoring request into the queue
//! - `/metrics` - Prometheus-compatible metrics
//! - `/health` - Liveness with uptime

mod handlers;
mod types;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use handlers::{health_handler, metrics_handler, proxy_score_handler};
pub use types::{AcceptedResponse, AppState, ErrorResponse, HealthResponse, ScoreQuery};

/// Builds the router with all front door routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/proxy/score", get(proxy_score_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Binds the front door listener on all interfaces.
///
/// # Errors
///
/// Returns an error if the port cannot be bound.
pub async fn bind(port: u16) -> Result<TcpListener, anyhow::Error> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind front door to port {}: {}", port, e))
}

/// Serves the front door until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish after cancellation.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Front door listening on http://{}/", addr);
        log::info!(
            "  - Enqueue: http://{}/proxy/score?{}=...",
            addr, state.subject_param
        );
        log::info!("  - Metrics: http://{}/metrics", addr);
        log::info!("  - Health: http://{}/health", addr);
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| anyhow::anyhow!("Front door server error: {}", e))?;

    log::info!("Front door stopped");
    Ok(())
}

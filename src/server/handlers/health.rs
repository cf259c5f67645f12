//! Liveness handler.

use axum::{extract::State, Json};

use super::super::types::{AppState, HealthResponse};

/// Reports that the process is up
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

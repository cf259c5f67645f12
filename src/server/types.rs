//! Front door data structures.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::observability::ProxyMetrics;
use crate::queue::PriorityQueue;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Queue requests are admitted into
    pub queue: Arc<PriorityQueue>,
    /// Metrics rendered by `/metrics`
    pub metrics: Arc<ProxyMetrics>,
    /// Query parameter carrying the subject key, shared with the upstream call
    pub subject_param: Arc<str>,
    /// Process start, for `/health` uptime
    pub started_at: Instant,
}

impl AppState {
    /// Creates handler state starting the uptime clock now.
    pub fn new(
        queue: Arc<PriorityQueue>,
        metrics: Arc<ProxyMetrics>,
        subject_param: impl Into<Arc<str>>,
    ) -> Self {
        AppState {
            queue,
            metrics,
            subject_param: subject_param.into(),
            started_at: Instant::now(),
        }
    }
}

/// Query string of `/proxy/score`
#[derive(Debug, Default, PartialEq)]
pub struct ScoreQuery {
    /// Subject key
    pub subject_key: Option<String>,
    /// Priority hint
    pub priority: Option<String>,
    /// Request type hint, sent as `type`
    pub kind: Option<String>,
}

impl ScoreQuery {
    /// Picks the subject key out of `params` under `subject_param`.
    pub fn from_params(mut params: HashMap<String, String>, subject_param: &str) -> Self {
        ScoreQuery {
            subject_key: params.remove(subject_param),
            priority: params.remove("priority"),
            kind: params.remove("type"),
        }
    }
}

/// 202 body of `/proxy/score`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    /// Human-readable confirmation
    pub message: &'static str,
    /// Id of the admitted job
    pub job_id: u64,
}

/// Error body of `/proxy/score`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
    /// Underlying cause, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// JSON response for `/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: &'static str,
    /// Seconds since the process started
    pub uptime: f64,
    /// Current time, RFC 3339
    pub timestamp: String,
}

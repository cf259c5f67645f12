//! Enqueue handler.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::super::types::{AcceptedResponse, AppState, ErrorResponse, ScoreQuery};
use crate::error_handling::QueueError;
use crate::queue::{EnqueueOutcome, JobRequest};

/// Admits a scoring request into the queue.
///
/// The subject key is read from the query parameter named by
/// `UPSTREAM_QUERY_PARAM` (`cpf` by default), the same name the upstream
/// call uses. `priority` and `type` are optional hints.
///
/// Responds 202 with the job id when admitted, 503 with the dropped record
/// when the queue is full, 400 when the subject key is missing and 500 when
/// the queue store fails.
pub async fn proxy_score_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = ScoreQuery::from_params(params, &state.subject_param);
    let Some(subject_key) = query.subject_key.filter(|key| !key.trim().is_empty()) else {
        return missing_key(&state.subject_param);
    };

    let request = JobRequest {
        subject_key,
        priority: query.priority,
        kind: query.kind,
    };

    match state.queue.enqueue(&request, None).await {
        Ok(EnqueueOutcome::Admitted(job)) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                message: "request queued",
                job_id: job.id,
            }),
        )
            .into_response(),
        Ok(EnqueueOutcome::Dropped(record)) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(record)).into_response()
        }
        Err(QueueError::MissingSubjectKey) => missing_key(&state.subject_param),
        Err(e) => {
            log::error!("Failed to enqueue request: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "failed to enqueue request".to_string(),
                    details: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

fn missing_key(subject_param: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: format!("query parameter '{}' is required", subject_param),
            details: None,
        }),
    )
        .into_response()
}

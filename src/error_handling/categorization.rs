//! Upstream failure classification and storage retry strategy.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::UpstreamFailure;
use crate::config::HTTP_STATUS_TOO_MANY_REQUESTS;

/// Creates the exponential backoff used when connecting to the storage backend.
///
/// Returns a retry strategy configured with:
/// - Initial delay: `STORE_RETRY_INITIAL_DELAY_MS` milliseconds
/// - Backoff factor: `STORE_RETRY_FACTOR`
/// - Maximum delay: `STORE_RETRY_MAX_DELAY_SECS` seconds
/// - Maximum attempts: `STORE_RETRY_MAX_ATTEMPTS`
pub fn get_store_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::STORE_RETRY_INITIAL_DELAY_MS)
        .factor(crate::config::STORE_RETRY_FACTOR)
        .max_delay(Duration::from_secs(
            crate::config::STORE_RETRY_MAX_DELAY_SECS,
        ))
        .take(crate::config::STORE_RETRY_MAX_ATTEMPTS)
}

/// Classifies an HTTP status returned by the upstream.
///
/// Returns `None` for success statuses (2xx), otherwise the failure it
/// represents: 429 is a rate-limit penalty, 5xx a server error, anything else
/// an unknown upstream error carrying the status.
pub fn classify_status(status: u16) -> Option<UpstreamFailure> {
    match status {
        200..=299 => None,
        HTTP_STATUS_TOO_MANY_REQUESTS => Some(UpstreamFailure::RateLimited),
        500..=599 => Some(UpstreamFailure::ServerError(status)),
        _ => Some(UpstreamFailure::Unknown {
            status: Some(status),
            message: format!("unexpected upstream status {}", status),
        }),
    }
}

/// Categorizes a `reqwest::Error` into an `UpstreamFailure`.
///
/// Status-bearing errors go through `classify_status` first; timeouts (including
/// a connect phase that timed out) become `Timeout`; everything else is
/// `Unknown`.
pub fn classify_reqwest_error(error: &reqwest::Error) -> UpstreamFailure {
    if let Some(status) = error.status() {
        if let Some(failure) = classify_status(status.as_u16()) {
            return failure;
        }
    }

    if error.is_timeout() {
        UpstreamFailure::Timeout
    } else {
        UpstreamFailure::Unknown {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_success_statuses() {
        assert_eq!(classify_status(200), None);
        assert_eq!(classify_status(204), None);
    }

    #[test]
    fn test_classify_rate_limited() {
        assert_eq!(classify_status(429), Some(UpstreamFailure::RateLimited));
    }

    #[test]
    fn test_classify_server_errors_keep_code() {
        assert_eq!(classify_status(500), Some(UpstreamFailure::ServerError(500)));
        assert_eq!(classify_status(502), Some(UpstreamFailure::ServerError(502)));
        assert_eq!(classify_status(503), Some(UpstreamFailure::ServerError(503)));
    }

    #[test]
    fn test_classify_other_client_errors_as_unknown() {
        match classify_status(404) {
            Some(UpstreamFailure::Unknown { status, .. }) => assert_eq!(status, Some(404)),
            other => panic!("expected Unknown, got {:?}", other),
        }
        match classify_status(400) {
            Some(UpstreamFailure::Unknown { status, .. }) => assert_eq!(status, Some(400)),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_store_retry_strategy_initial_delay() {
        let first_delay = get_store_retry_strategy().next().unwrap();
        let expected_ms = crate::config::STORE_RETRY_INITIAL_DELAY_MS as u128;
        assert!(
            first_delay.as_millis() >= expected_ms,
            "Expected delay >= {}ms, got {}ms",
            expected_ms,
            first_delay.as_millis()
        );
    }

    #[test]
    fn test_store_retry_strategy_max_delay() {
        let max_delay_ms = crate::config::STORE_RETRY_MAX_DELAY_SECS * 1000;
        for delay in get_store_retry_strategy() {
            assert!(
                delay.as_millis() <= max_delay_ms as u128,
                "Delay {}ms exceeds max {}ms",
                delay.as_millis(),
                max_delay_ms
            );
        }
    }

    #[test]
    fn test_store_retry_strategy_max_attempts() {
        assert_eq!(
            get_store_retry_strategy().count(),
            crate::config::STORE_RETRY_MAX_ATTEMPTS
        );
    }

    // Classifying real reqwest::Error values needs an HTTP server; see
    // tests/upstream_client.rs for the wiremock-backed cases.
}

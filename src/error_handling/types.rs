//! Error type definitions.
//!
//! This module defines the error types used throughout the proxy, plus the
//! classification of a failed upstream call.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error connecting to the storage backend.
    #[error("Storage initialization error: {0}")]
    StoreError(#[from] StoreError),

    /// The configuration cannot be used.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Invalid configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting that must be positive is zero (or empty).
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    /// The penalized cadence would drain faster than the base cadence.
    #[error("penalty interval ({penalty_ms}ms) must not be shorter than the base interval ({base_ms}ms)")]
    PenaltyFasterThanBase {
        /// Base interval in milliseconds
        base_ms: u64,
        /// Penalized interval in milliseconds
        penalty_ms: u64,
    },

    /// A setting exceeds its upper bound.
    #[error("{setting} ({value}) must not exceed {max}")]
    TooLarge {
        /// Name of the setting
        setting: &'static str,
        /// Configured value
        value: u64,
        /// Largest accepted value
        max: u64,
    },

    /// The upstream URL does not parse.
    #[error("invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),
}

/// Errors raised by a storage backend (queue lists and cache keys).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Redis command or connection failure.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Errors raised by the admission layer.
///
/// A full queue is *not* an error: it is reported as a `DroppedRecord`.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The request carried no subject key.
    #[error("subject key is required")]
    MissingSubjectKey,

    /// The backing store failed.
    #[error("Queue storage error: {0}")]
    Store(#[from] StoreError),

    /// A job could not be serialized for storage.
    #[error("Failed to serialize job: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Classification of one failed upstream call.
///
/// Each variant drives breaker-failure accounting and its own metric.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// Client-side timeout or aborted connection.
    #[error("upstream request timed out")]
    Timeout,

    /// The upstream answered 429 Too Many Requests.
    #[error("upstream rate limited the proxy (429)")]
    RateLimited,

    /// The upstream answered with a 5xx status.
    #[error("upstream server error ({0})")]
    ServerError(u16),

    /// Anything else: connection refused, unexpected 4xx, undecodable body.
    #[error("upstream error ({}): {message}", .status.map_or_else(|| "unknown".to_string(), |s| s.to_string()))]
    Unknown {
        /// HTTP status, when one was received
        status: Option<u16>,
        /// Description of the failure
        message: String,
    },
}

impl UpstreamFailure {
    /// HTTP status code carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamFailure::Timeout => None,
            UpstreamFailure::RateLimited => Some(crate::config::HTTP_STATUS_TOO_MANY_REQUESTS),
            UpstreamFailure::ServerError(code) => Some(*code),
            UpstreamFailure::Unknown { status, .. } => *status,
        }
    }

    /// Short label used in metrics.
    pub fn kind(&self) -> FailureKind {
        match self {
            UpstreamFailure::Timeout => FailureKind::Timeout,
            UpstreamFailure::RateLimited => FailureKind::RateLimited,
            UpstreamFailure::ServerError(_) => FailureKind::ServerError,
            UpstreamFailure::Unknown { .. } => FailureKind::Unknown,
        }
    }
}

/// Label-only view of `UpstreamFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureKind {
    /// Client-side timeout
    Timeout,
    /// 429 penalty signal
    RateLimited,
    /// 5xx response
    ServerError,
    /// Anything else
    Unknown,
}

impl FailureKind {
    /// Returns the metric label for this failure kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ServerError => "server_error",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

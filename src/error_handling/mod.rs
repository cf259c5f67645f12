//! Error handling.
//!
//! This module provides:
//! - Error type definitions for initialization, configuration, storage and admission
//! - Classification of failed upstream calls
//! - The retry strategy used when connecting to storage

mod categorization;
mod types;

// Re-export public API
pub use categorization::{classify_reqwest_error, classify_status, get_store_retry_strategy};
pub use types::{
    ConfigError, FailureKind, InitializationError, QueueError, StoreError, UpstreamFailure,
};

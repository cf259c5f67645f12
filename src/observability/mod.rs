//! Observer hooks and the Prometheus-backed implementation.
//!
//! The queue and scheduler report everything they do through `ProxyObserver`.
//! Every hook has a no-op default so tests can implement only what they
//! inspect.

mod metrics;
mod types;

use std::time::Duration;

use crate::breaker::{BreakerState, BreakerTransition};

pub use metrics::ProxyMetrics;
pub use types::{FallbackReason, JobStatus};

/// Receives events from the queue and the scheduler.
pub trait ProxyObserver: Send + Sync {
    /// Latest total queue size.
    fn queue_size(&self, _size: usize) {}

    /// A job reached `status`.
    fn job(&self, _status: JobStatus) {}

    /// Upstream latency of a processed job.
    fn latency(&self, _elapsed: Duration) {}

    /// A job was answered with a fallback.
    fn fallback(&self, _reason: FallbackReason) {}

    /// The breaker is now in `state`.
    fn breaker_state(&self, _state: BreakerState) {}

    /// The breaker changed state.
    fn breaker_transition(&self, _transition: BreakerTransition) {}

    /// A tick skipped the upstream because of the breaker.
    fn short_circuit(&self) {}

    /// The upstream answered 429 and the cadence was penalized.
    fn rate_limit_penalty(&self) {}

    /// An upstream call timed out.
    fn upstream_timeout(&self) {}

    /// An upstream call failed with `code` (a status or `unknown`).
    fn upstream_error(&self, _code: &str) {}

    /// The drain interval is now `interval`.
    fn scheduler_interval(&self, _interval: Duration) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProxyObserver for NoopObserver {}

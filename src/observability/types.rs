//! Metric label types.

use strum_macros::EnumIter as EnumIterMacro;

/// What happened to a job, as exported by `proxy_jobs_total{status}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum JobStatus {
    /// Admitted to the queue
    Accepted,
    /// Rejected at admission because the queue was full
    Dropped,
    /// Evicted from the queue to admit a higher-priority job
    Preempted,
    /// Discarded at dequeue because its TTL had passed
    Expired,
    /// Discarded at dequeue because the stored record could not be parsed
    Invalid,
    /// Served from the cache without an upstream call
    Cached,
    /// Upstream call succeeded
    Processed,
    /// Upstream call failed
    Failed,
    /// Not called because the breaker was open or half-open blocked
    Fallback,
    /// Upstream call failed and a cached response was served instead
    FallbackCached,
}

impl JobStatus {
    /// Returns the metric label for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Accepted => "accepted",
            JobStatus::Dropped => "dropped",
            JobStatus::Preempted => "preempted",
            JobStatus::Expired => "expired",
            JobStatus::Invalid => "invalid",
            JobStatus::Cached => "cached",
            JobStatus::Processed => "processed",
            JobStatus::Failed => "failed",
            JobStatus::Fallback => "fallback",
            JobStatus::FallbackCached => "fallback_cached",
        }
    }
}

/// Why a job was answered with a fallback, as exported by
/// `proxy_fallbacks_total{reason}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FallbackReason {
    /// Breaker open within its window
    BreakerOpen,
    /// Breaker half-open with the probe already taken
    BreakerHalfOpenBlocked,
    /// A cached response was served after a failed call
    CacheFallback,
    /// The upstream call timed out
    Timeout,
    /// The upstream answered 5xx
    Upstream5xx,
}

impl FallbackReason {
    /// Returns the metric label for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::BreakerOpen => "breaker_open",
            FallbackReason::BreakerHalfOpenBlocked => "breaker_half_open_blocked",
            FallbackReason::CacheFallback => "cache_fallback",
            FallbackReason::Timeout => "timeout",
            FallbackReason::Upstream5xx => "upstream_5xx",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Scheduler settings and tick outcomes.

use std::time::Duration;

use crate::config::Config;
use crate::error_handling::UpstreamFailure;

/// Breaker and cadence settings of a `Scheduler`.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Consecutive failures that open the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before a probe
    pub open_window: Duration,
    /// Base drain interval
    pub base_interval: Duration,
    /// Drain interval after a 429
    pub penalty_interval: Duration,
    /// Period of the queue-size sampler
    pub sample_interval: Duration,
}

impl SchedulerSettings {
    /// Reads the scheduler settings from the proxy configuration.
    pub fn from_config(config: &Config) -> Self {
        SchedulerSettings {
            failure_threshold: config.breaker_failure_threshold,
            open_window: config.breaker_open_window(),
            base_interval: config.scheduler_interval(),
            penalty_interval: config.scheduler_penalty_interval(),
            sample_interval: config.queue_size_sample_interval(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What one drain tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was empty
    Idle,
    /// A cached response existed; the upstream was not called
    Cached {
        /// Job handled by this tick
        job_id: u64,
    },
    /// The upstream call succeeded
    Processed {
        /// Job handled by this tick
        job_id: u64,
    },
    /// The breaker was open; the upstream was not called
    ShortCircuited {
        /// Job handled by this tick
        job_id: u64,
    },
    /// The breaker was half-open with its probe taken; the upstream was not called
    HalfOpenBlocked {
        /// Job handled by this tick
        job_id: u64,
    },
    /// The upstream call failed and a cached response was served
    CacheFallback {
        /// Job handled by this tick
        job_id: u64,
        /// Why the call failed
        failure: UpstreamFailure,
    },
    /// The upstream call failed and nothing could be served
    Failed {
        /// Job handled by this tick
        job_id: u64,
        /// Why the call failed
        failure: UpstreamFailure,
    },
    /// The queue store could not be read
    QueueUnavailable,
}

impl TickOutcome {
    /// Whether this tick called the upstream.
    pub fn called_upstream(&self) -> bool {
        matches!(
            self,
            TickOutcome::Processed { .. }
                | TickOutcome::CacheFallback { .. }
                | TickOutcome::Failed { .. }
        )
    }
}

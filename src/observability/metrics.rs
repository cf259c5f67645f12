//! Thread-safe proxy metrics with Prometheus text rendering.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use strum::IntoEnumIterator;

use super::types::{FallbackReason, JobStatus};
use super::ProxyObserver;
use crate::breaker::{BreakerState, BreakerTransition};

/// Upper bounds of the latency histogram buckets, in seconds.
pub const LATENCY_BUCKETS: [f64; 6] = [0.1, 0.5, 1.0, 2.0, 3.0, 5.0];

/// Counters and gauges for every observer hook.
///
/// Labelled counters are keyed by the label enums and initialized to zero on
/// creation, so every series is exported even before its first event. Upstream
/// error codes are open-ended and kept in a small locked map instead.
///
/// # Thread Safety
///
/// This struct is thread-safe and can be shared across tasks using `Arc`.
pub struct ProxyMetrics {
    queue_size: AtomicUsize,
    jobs: HashMap<JobStatus, AtomicUsize>,
    fallbacks: HashMap<FallbackReason, AtomicUsize>,
    transitions: HashMap<BreakerTransition, AtomicUsize>,
    upstream_errors: Mutex<BTreeMap<String, usize>>,
    circuit_state: AtomicU8,
    short_circuits: AtomicUsize,
    timeouts: AtomicUsize,
    rate_limit_penalties: AtomicUsize,
    scheduler_interval_ms: AtomicU64,
    latency_buckets: [AtomicU64; LATENCY_BUCKETS.len()],
    latency_count: AtomicU64,
    latency_sum_micros: AtomicU64,
}

impl ProxyMetrics {
    /// Creates a metrics registry with every counter at zero.
    ///
    /// # Arguments
    ///
    /// * `initial_interval` - Drain interval exported until the scheduler reports one
    pub fn new(initial_interval: Duration) -> Self {
        let mut jobs = HashMap::new();
        for status in JobStatus::iter() {
            jobs.insert(status, AtomicUsize::new(0));
        }

        let mut fallbacks = HashMap::new();
        for reason in FallbackReason::iter() {
            fallbacks.insert(reason, AtomicUsize::new(0));
        }

        let mut transitions = HashMap::new();
        for transition in BreakerTransition::iter() {
            transitions.insert(transition, AtomicUsize::new(0));
        }

        ProxyMetrics {
            queue_size: AtomicUsize::new(0),
            jobs,
            fallbacks,
            transitions,
            upstream_errors: Mutex::new(BTreeMap::new()),
            circuit_state: AtomicU8::new(BreakerState::Closed.gauge_value()),
            short_circuits: AtomicUsize::new(0),
            timeouts: AtomicUsize::new(0),
            rate_limit_penalties: AtomicUsize::new(0),
            scheduler_interval_ms: AtomicU64::new(duration_ms(initial_interval)),
            latency_buckets: Default::default(),
            latency_count: AtomicU64::new(0),
            latency_sum_micros: AtomicU64::new(0),
        }
    }

    /// Number of jobs that reached `status`.
    pub fn job_count(&self, status: JobStatus) -> usize {
        self.jobs
            .get(&status)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of fallbacks served for `reason`.
    pub fn fallback_count(&self, reason: FallbackReason) -> usize {
        self.fallbacks
            .get(&reason)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of times the breaker took `transition`.
    pub fn transition_count(&self, transition: BreakerTransition) -> usize {
        self.transitions
            .get(&transition)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of upstream errors recorded under `code`.
    pub fn upstream_error_count(&self, code: &str) -> usize {
        self.lock_upstream_errors().get(code).copied().unwrap_or(0)
    }

    /// Last reported queue size.
    pub fn queue_size_value(&self) -> usize {
        self.queue_size.load(Ordering::SeqCst)
    }

    /// Last reported breaker state gauge (0 closed, 1 open, 2 half-open).
    pub fn circuit_state_value(&self) -> u8 {
        self.circuit_state.load(Ordering::SeqCst)
    }

    /// Total breaker short-circuits.
    pub fn short_circuit_count(&self) -> usize {
        self.short_circuits.load(Ordering::SeqCst)
    }

    /// Total upstream timeouts.
    pub fn timeout_count(&self) -> usize {
        self.timeouts.load(Ordering::SeqCst)
    }

    /// Total 429 penalties.
    pub fn rate_limit_penalty_count(&self) -> usize {
        self.rate_limit_penalties.load(Ordering::SeqCst)
    }

    /// Last reported drain interval in milliseconds.
    pub fn scheduler_interval_ms_value(&self) -> u64 {
        self.scheduler_interval_ms.load(Ordering::SeqCst)
    }

    /// Number of latency observations.
    pub fn latency_count(&self) -> u64 {
        self.latency_count.load(Ordering::SeqCst)
    }

    /// Renders every metric in the Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::with_capacity(4096);

        let _ = writeln!(
            out,
            "# HELP proxy_queue_size Current number of queued jobs\n\
             # TYPE proxy_queue_size gauge\n\
             proxy_queue_size {}\n",
            self.queue_size_value()
        );

        let _ = writeln!(
            out,
            "# HELP proxy_jobs_total Jobs by outcome\n# TYPE proxy_jobs_total counter"
        );
        for status in JobStatus::iter() {
            let _ = writeln!(
                out,
                "proxy_jobs_total{{status=\"{}\"}} {}",
                status.as_str(),
                self.job_count(status)
            );
        }
        out.push('\n');

        self.render_latency(&mut out);

        let _ = writeln!(
            out,
            "# HELP proxy_circuit_state Circuit breaker state (0 closed, 1 open, 2 half-open)\n\
             # TYPE proxy_circuit_state gauge\n\
             proxy_circuit_state {}\n",
            self.circuit_state_value()
        );

        for (transition, name, help) in [
            (
                BreakerTransition::Opened,
                "proxy_circuit_open_total",
                "Times the circuit opened",
            ),
            (
                BreakerTransition::HalfOpened,
                "proxy_circuit_half_open_total",
                "Times the circuit moved to half-open",
            ),
            (
                BreakerTransition::Closed,
                "proxy_circuit_close_total",
                "Times the circuit closed",
            ),
        ] {
            let _ = writeln!(
                out,
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n",
                self.transition_count(transition)
            );
        }

        for (name, help, value) in [
            (
                "proxy_short_circuits_total",
                "Ticks that skipped the upstream because of the breaker",
                self.short_circuit_count(),
            ),
            (
                "proxy_timeouts_total",
                "Upstream calls that timed out",
                self.timeout_count(),
            ),
            (
                "proxy_rate_limit_penalties_total",
                "Upstream 429 responses that slowed the scheduler",
                self.rate_limit_penalty_count(),
            ),
        ] {
            let _ = writeln!(
                out,
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"
            );
        }

        let _ = writeln!(
            out,
            "# HELP proxy_upstream_errors_total Upstream errors by status code\n\
             # TYPE proxy_upstream_errors_total counter"
        );
        for (code, count) in self.lock_upstream_errors().iter() {
            let _ = writeln!(out, "proxy_upstream_errors_total{{code=\"{code}\"}} {count}");
        }
        out.push('\n');

        let _ = writeln!(
            out,
            "# HELP proxy_fallbacks_total Fallback responses by reason\n\
             # TYPE proxy_fallbacks_total counter"
        );
        for reason in FallbackReason::iter() {
            let _ = writeln!(
                out,
                "proxy_fallbacks_total{{reason=\"{}\"}} {}",
                reason.as_str(),
                self.fallback_count(reason)
            );
        }
        out.push('\n');

        let _ = writeln!(
            out,
            "# HELP proxy_scheduler_interval_ms Current drain interval in milliseconds\n\
             # TYPE proxy_scheduler_interval_ms gauge\n\
             proxy_scheduler_interval_ms {}",
            self.scheduler_interval_ms_value()
        );

        out
    }

    fn render_latency(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "# HELP proxy_job_latency_seconds Upstream latency of processed jobs\n\
             # TYPE proxy_job_latency_seconds histogram"
        );
        let mut cumulative = 0;
        for (bound, bucket) in LATENCY_BUCKETS.iter().zip(self.latency_buckets.iter()) {
            cumulative += bucket.load(Ordering::SeqCst);
            let _ = writeln!(
                out,
                "proxy_job_latency_seconds_bucket{{le=\"{bound}\"}} {cumulative}"
            );
        }
        let count = self.latency_count();
        let sum = self.latency_sum_micros.load(Ordering::SeqCst) as f64 / 1_000_000.0;
        let _ = writeln!(
            out,
            "proxy_job_latency_seconds_bucket{{le=\"+Inf\"}} {count}\n\
             proxy_job_latency_seconds_sum {sum}\n\
             proxy_job_latency_seconds_count {count}\n"
        );
    }

    fn lock_upstream_errors(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, usize>> {
        // Counters stay usable even if a writer panicked mid-update
        self.upstream_errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProxyObserver for ProxyMetrics {
    fn queue_size(&self, size: usize) {
        self.queue_size.store(size, Ordering::SeqCst);
    }

    fn job(&self, status: JobStatus) {
        if let Some(counter) = self.jobs.get(&status) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn latency(&self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        if let Some(idx) = LATENCY_BUCKETS.iter().position(|bound| seconds <= *bound) {
            self.latency_buckets[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latency_sum_micros.fetch_add(micros, Ordering::Relaxed);
    }

    fn fallback(&self, reason: FallbackReason) {
        if let Some(counter) = self.fallbacks.get(&reason) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn breaker_state(&self, state: BreakerState) {
        self.circuit_state.store(state.gauge_value(), Ordering::SeqCst);
    }

    fn breaker_transition(&self, transition: BreakerTransition) {
        if let Some(counter) = self.transitions.get(&transition) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn short_circuit(&self) {
        self.short_circuits.fetch_add(1, Ordering::Relaxed);
    }

    fn rate_limit_penalty(&self) {
        self.rate_limit_penalties.fetch_add(1, Ordering::Relaxed);
    }

    fn upstream_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn upstream_error(&self, code: &str) {
        *self
            .lock_upstream_errors()
            .entry(code.to_string())
            .or_insert(0) += 1;
    }

    fn scheduler_interval(&self, interval: Duration) {
        self.scheduler_interval_ms
            .store(duration_ms(interval), Ordering::SeqCst);
    }
}

impl Default for ProxyMetrics {
    fn default() -> Self {
        Self::new(Duration::from_millis(
            crate::config::DEFAULT_SCHEDULER_INTERVAL_MS,
        ))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

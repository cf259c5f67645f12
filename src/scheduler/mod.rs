//! Adaptive drain scheduler.
//!
//! A `Scheduler` drains one job per tick: cache lookup, breaker gate,
//! upstream call, then cache/breaker/cadence updates. Ticks run under a mutex
//! that owns the breaker and the cadence, so at most one tick is ever in
//! flight no matter how many tasks call `process_queue`.
//!
//! The drain interval lives in a `watch` channel. The drain loop started by
//! `Scheduler::start` restarts its timer whenever the interval changes, so a
//! penalty takes effect from the next tick.

mod cadence;
mod runner;
mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};

use crate::breaker::{Admission, BreakerState, BreakerTransition, CircuitBreaker};
use crate::cache::ResponseCache;
use crate::error_handling::UpstreamFailure;
use crate::observability::{FallbackReason, JobStatus, ProxyObserver};
use crate::queue::{Job, PriorityQueue};
use crate::upstream::Upstream;

pub use cadence::Cadence;
pub use runner::SchedulerHandles;
pub use types::{SchedulerSettings, TickOutcome};

/// State only a tick may touch.
struct TickState {
    breaker: CircuitBreaker,
    cadence: Cadence,
}

/// Drains the queue against the upstream.
pub struct Scheduler {
    queue: Arc<PriorityQueue>,
    cache: Arc<ResponseCache>,
    upstream: Arc<dyn Upstream>,
    observer: Arc<dyn ProxyObserver>,
    state: Mutex<TickState>,
    interval_tx: watch::Sender<Duration>,
    sample_interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler with a closed breaker and the base cadence.
    ///
    /// Reports the initial breaker state and interval to the observer.
    pub fn new(
        queue: Arc<PriorityQueue>,
        cache: Arc<ResponseCache>,
        upstream: Arc<dyn Upstream>,
        observer: Arc<dyn ProxyObserver>,
        settings: SchedulerSettings,
    ) -> Self {
        let breaker = CircuitBreaker::new(settings.failure_threshold, settings.open_window);
        let cadence = Cadence::new(settings.base_interval, settings.penalty_interval);
        let (interval_tx, _) = watch::channel(cadence.current());

        observer.breaker_state(breaker.state());
        observer.scheduler_interval(cadence.current());

        Scheduler {
            queue,
            cache,
            upstream,
            observer,
            state: Mutex::new(TickState { breaker, cadence }),
            interval_tx,
            sample_interval: settings.sample_interval,
        }
    }

    /// Current drain interval.
    pub fn current_interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Receiver that sees every drain interval change.
    pub fn subscribe_interval(&self) -> watch::Receiver<Duration> {
        self.interval_tx.subscribe()
    }

    /// Current breaker state. Waits for an in-flight tick to finish.
    pub async fn breaker_state(&self) -> BreakerState {
        self.state.lock().await.breaker.state()
    }

    /// Publishes the current queue size to the observer.
    pub async fn sample_queue_size(&self) {
        match self.queue.size().await {
            Ok(size) => self.observer.queue_size(size),
            Err(e) => log::warn!("Could not sample queue size: {}", e),
        }
    }

    /// Runs one drain tick.
    ///
    /// Never fails: every branch ends the tick with an outcome so the drain
    /// loop keeps going.
    pub async fn process_queue(&self) -> TickOutcome {
        let mut state = self.state.lock().await;

        let job = match self.queue.dequeue().await {
            Ok(Some(job)) => job,
            Ok(None) => return TickOutcome::Idle,
            Err(e) => {
                log::error!("Dequeue failed, skipping tick: {}", e);
                return TickOutcome::QueueUnavailable;
            }
        };

        if self.cache.get(&job.subject_key).await.is_some() {
            self.observer.job(JobStatus::Cached);
            log::info!("Job {} answered from cache", job.id);
            return TickOutcome::Cached { job_id: job.id };
        }

        let (admission, transition) = state.breaker.admit(Instant::now());
        self.report_transition(transition);
        match admission {
            Admission::ShortCircuit { remaining } => {
                self.short_circuit(FallbackReason::BreakerOpen);
                log::warn!(
                    "Circuit open, short-circuiting job {} ({}ms left)",
                    job.id,
                    remaining.as_millis()
                );
                return TickOutcome::ShortCircuited { job_id: job.id };
            }
            Admission::ProbeBlocked => {
                self.short_circuit(FallbackReason::BreakerHalfOpenBlocked);
                log::warn!("Circuit half-open awaiting probe, blocking job {}", job.id);
                return TickOutcome::HalfOpenBlocked { job_id: job.id };
            }
            Admission::Allow | Admission::Probe => {}
        }

        let started = Instant::now();
        match self.upstream.fetch(&job.subject_key).await {
            Ok(payload) => {
                let elapsed = started.elapsed();
                self.cache.set(&job.subject_key, &payload).await;
                self.observer.job(JobStatus::Processed);
                self.observer.latency(elapsed);
                log::info!("Job {} processed in {}ms", job.id, elapsed.as_millis());

                if let Some(interval) = state.cadence.restore() {
                    self.publish_interval(interval);
                }
                let transition = state.breaker.record_success();
                self.report_transition(transition);

                TickOutcome::Processed { job_id: job.id }
            }
            Err(failure) => self.handle_failure(&mut state, &job, failure).await,
        }
    }

    async fn handle_failure(
        &self,
        state: &mut TickState,
        job: &Job,
        failure: UpstreamFailure,
    ) -> TickOutcome {
        self.observer.job(JobStatus::Failed);
        log::error!("Job {} failed ({}): {}", job.id, failure.kind(), failure);

        let outcome = if self.cache.get(&job.subject_key).await.is_some() {
            self.observer.job(JobStatus::FallbackCached);
            self.observer.fallback(FallbackReason::CacheFallback);
            log::warn!("Serving cached response for job {}", job.id);
            TickOutcome::CacheFallback {
                job_id: job.id,
                failure,
            }
        } else {
            match &failure {
                UpstreamFailure::RateLimited => {
                    self.observer.rate_limit_penalty();
                    if let Some(interval) = state.cadence.penalize() {
                        self.publish_interval(interval);
                    }
                }
                UpstreamFailure::Timeout => {
                    self.observer.upstream_timeout();
                    self.observer.fallback(FallbackReason::Timeout);
                }
                UpstreamFailure::ServerError(code) => {
                    self.observer.upstream_error(&code.to_string());
                    self.observer.fallback(FallbackReason::Upstream5xx);
                }
                UpstreamFailure::Unknown { .. } => {
                    let code = failure
                        .status()
                        .map_or_else(|| "unknown".to_string(), |s| s.to_string());
                    self.observer.upstream_error(&code);
                }
            }
            TickOutcome::Failed {
                job_id: job.id,
                failure,
            }
        };

        // A served fallback still counts against upstream health
        let transition = state.breaker.record_failure(Instant::now());
        self.report_transition(transition);

        outcome
    }

    fn short_circuit(&self, reason: FallbackReason) {
        self.observer.short_circuit();
        self.observer.fallback(reason);
        self.observer.job(JobStatus::Fallback);
    }

    fn report_transition(&self, transition: Option<BreakerTransition>) {
        if let Some(transition) = transition {
            self.observer.breaker_transition(transition);
            self.observer.breaker_state(transition.target());
        }
    }

    fn publish_interval(&self, interval: Duration) {
        self.interval_tx.send_replace(interval);
        self.observer.scheduler_interval(interval);
        log::warn!("Drain cadence adjusted to {}ms", interval.as_millis());
    }
}

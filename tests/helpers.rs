// Shared test helpers: configs, a scripted upstream and proxy assembly.
//
// Each integration test file includes this with `mod helpers;` and uses a
// subset of it.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use score_proxy::error_handling::UpstreamFailure;
use score_proxy::initialization::Storage;
use score_proxy::queue::{EnqueueOutcome, Job, JobRequest, PriorityQueue};
use score_proxy::upstream::Upstream;
use score_proxy::{assemble, Config, LogFormat, LogLevel, ProxyResources};

/// Config with short timings suited to tests.
pub fn test_config() -> Config {
    Config {
        log_level: LogLevel::Error,
        log_format: LogFormat::Plain,
        queue_max_size: 10,
        job_ttl_ms: 60_000,
        request_timeout_ms: 200,
        breaker_failure_threshold: 3,
        breaker_open_window_ms: 10_000,
        scheduler_interval_ms: 50,
        scheduler_penalty_interval_ms: 150,
        queue_size_sample_ms: 50,
        cache_ttl_secs: 60,
        disable_cache: false,
        redis_url: None,
        ..Config::default()
    }
}

/// Upstream that replays a fixed script of outcomes.
///
/// Once the script runs out every call succeeds with `{"score": 500}`.
pub struct ScriptedUpstream {
    script: Mutex<VecDeque<Result<Value, UpstreamFailure>>>,
    calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn new(script: Vec<Result<Value, UpstreamFailure>>) -> Arc<Self> {
        Arc::new(ScriptedUpstream {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always_ok() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn push(&self, outcome: Result<Value, UpstreamFailure>) {
        self.script.lock().unwrap().push_back(outcome);
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn fetch(&self, _subject_key: &str) -> Result<Value, UpstreamFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "score": 500 })))
    }
}

/// Builds a proxy on in-process storage around `upstream`.
pub fn build_proxy(config: Config, upstream: Arc<dyn Upstream>) -> ProxyResources {
    assemble(config, Storage::in_memory(), upstream)
}

/// A queue on fresh in-process storage with no observer.
pub fn memory_queue(capacity: usize) -> PriorityQueue {
    PriorityQueue::new(
        Storage::in_memory().queue,
        capacity,
        Duration::from_secs(60),
        Arc::new(score_proxy::observability::NoopObserver),
    )
}

/// Enqueues `key` with a priority hint and expects admission.
pub async fn admit(queue: &PriorityQueue, key: &str, priority: &str) -> Job {
    let request = JobRequest::new(key).with_priority(priority);
    match queue.enqueue(&request, None).await.expect("enqueue failed") {
        EnqueueOutcome::Admitted(job) => job,
        EnqueueOutcome::Dropped(record) => panic!("{} was dropped: {:?}", key, record),
    }
}

/// Enqueues `key` with a priority hint and returns the raw outcome.
pub async fn try_admit(queue: &PriorityQueue, key: &str, priority: &str) -> EnqueueOutcome {
    let request = JobRequest::new(key).with_priority(priority);
    queue.enqueue(&request, None).await.expect("enqueue failed")
}

/// Drains the queue, returning subject keys in delivery order.
pub async fn drain_keys(queue: &PriorityQueue) -> Vec<String> {
    let mut keys = Vec::new();
    while let Some(job) = queue.dequeue().await.expect("dequeue failed") {
        keys.push(job.subject_key);
    }
    keys
}

//! Bounded three-class priority queue with preemption and expiry.
//!
//! Jobs are stored as JSON records in three FIFO lists (one per class) on a
//! `QueueStore`. The total across the lists never exceeds the configured
//! capacity: when it is reached a High job evicts the newest Low (or, failing
//! that, Normal) job, a Normal job evicts the newest Low job, and a Low job is
//! dropped.
//!
//! Admission is serialized per `PriorityQueue` instance. Dequeue needs no lock:
//! it only ever shrinks the queue, and each pop is atomic on the store.

mod job;
mod priority;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error_handling::QueueError;
use crate::observability::{JobStatus, ProxyObserver};
use crate::storage::QueueStore;

pub use job::{
    DroppedRecord, EnqueueOutcome, Job, JobRequest, Priority, DROPPED_STATUS, QUEUE_FULL_REASON,
};
pub use priority::resolve_priority;

/// The admission-controlled job queue.
pub struct PriorityQueue {
    store: Arc<dyn QueueStore>,
    max_capacity: usize,
    job_ttl: Duration,
    observer: Arc<dyn ProxyObserver>,
    /// Serializes size check, eviction and append
    admission: Mutex<()>,
}

impl PriorityQueue {
    /// Creates a queue over `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Backing lists and id sequence
    /// * `max_capacity` - Maximum number of jobs across all classes
    /// * `job_ttl` - Default lifetime of an admitted job
    /// * `observer` - Receives accepted, dropped, preempted, expired and invalid events
    pub fn new(
        store: Arc<dyn QueueStore>,
        max_capacity: usize,
        job_ttl: Duration,
        observer: Arc<dyn ProxyObserver>,
    ) -> Self {
        PriorityQueue {
            store,
            max_capacity,
            job_ttl,
            observer,
            admission: Mutex::new(()),
        }
    }

    /// Attempts to admit a job.
    ///
    /// A full queue is not an error: the request is either admitted by
    /// evicting a lower-priority job or returned as a `DroppedRecord`.
    ///
    /// # Arguments
    ///
    /// * `request` - Subject key plus optional priority and type hints
    /// * `ttl_override` - Lifetime for this job instead of the queue default
    ///
    /// # Errors
    ///
    /// Returns `QueueError::MissingSubjectKey` for a blank key, or a storage or
    /// serialization error if the job could not be written. A job evicted to
    /// make room is put back before the error is returned.
    pub async fn enqueue(
        &self,
        request: &JobRequest,
        ttl_override: Option<Duration>,
    ) -> Result<EnqueueOutcome, QueueError> {
        let subject_key = request.subject_key.trim();
        if subject_key.is_empty() {
            return Err(QueueError::MissingSubjectKey);
        }
        let priority = resolve_priority(request.priority.as_deref(), request.kind.as_deref());

        let _admission = self.admission.lock().await;

        let size = self.size().await?;
        let mut eviction = None;
        if size >= self.max_capacity {
            match self.make_room(priority).await? {
                Room::Evicted(evicted) => eviction = Some(evicted),
                Room::Freed => {}
                Room::Full => {
                    self.observer.job(JobStatus::Dropped);
                    log::warn!(
                        "Queue full ({}/{}), dropping {} request",
                        size,
                        self.max_capacity,
                        priority
                    );
                    return Ok(EnqueueOutcome::Dropped(DroppedRecord::queue_full(priority)));
                }
            }
        }

        let job = match self.append(subject_key, priority, ttl_override).await {
            Ok(job) => job,
            Err(e) => {
                if let Some(evicted) = eviction {
                    self.restore(evicted).await;
                }
                return Err(e);
            }
        };

        if let Some(evicted) = eviction {
            self.observer.job(JobStatus::Preempted);
            log::warn!(
                "Preempted {} job {} to admit {} job {}",
                evicted.class,
                evicted.label(),
                priority,
                job.id
            );
        }
        self.observer.job(JobStatus::Accepted);
        log::info!("Job {} admitted ({})", job.id, priority);
        log::debug!("Job {} subject key: {}", job.id, job.subject_key);

        Ok(EnqueueOutcome::Admitted(job))
    }

    async fn append(
        &self,
        subject_key: &str,
        priority: Priority,
        ttl_override: Option<Duration>,
    ) -> Result<Job, QueueError> {
        let id = self.store.next_id().await?;
        let created_at = Utc::now();
        let ttl = ttl_override.unwrap_or(self.job_ttl);
        let job = Job {
            id,
            subject_key: subject_key.to_string(),
            priority,
            created_at,
            expires_at: expiry(created_at, ttl),
        };

        let record = serde_json::to_string(&job)?;
        self.store.push_back(priority, record).await?;
        Ok(job)
    }

    /// Evicts one job a `priority` request is allowed to preempt.
    async fn make_room(&self, priority: Priority) -> Result<Room, QueueError> {
        let victims = priority.preemption_victims();
        for &class in victims {
            if let Some(record) = self.store.pop_back(class).await? {
                return Ok(Room::Evicted(Eviction { class, record }));
            }
        }

        if victims.is_empty() {
            return Ok(Room::Full);
        }
        // Every victim class was empty; a concurrent dequeue may have freed a slot
        if self.size().await? < self.max_capacity {
            Ok(Room::Freed)
        } else {
            Ok(Room::Full)
        }
    }

    /// Puts an evicted record back at the tail it was popped from.
    async fn restore(&self, evicted: Eviction) {
        let label = evicted.label();
        match self.store.push_back(evicted.class, evicted.record.clone()).await {
            Ok(()) => log::warn!(
                "Admission failed, restored preempted {} job {}",
                evicted.class,
                label
            ),
            Err(e) => log::error!(
                "Admission failed and preempted {} job {} could not be restored: {}; lost record: {}",
                evicted.class,
                label,
                e,
                evicted.record
            ),
        }
    }

    /// Removes and returns the next live job.
    ///
    /// Classes are scanned High, Normal, Low; within a class the oldest job
    /// comes first. Expired and unparseable records are discarded and counted
    /// until a live job is found or the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Store` if the backing store fails.
    pub async fn dequeue(&self) -> Result<Option<Job>, QueueError> {
        for class in Priority::DRAIN_ORDER {
            while let Some(raw) = self.store.pop_front(class).await? {
                let job = match serde_json::from_str::<Job>(&raw) {
                    Ok(job) => job,
                    Err(e) => {
                        self.observer.job(JobStatus::Invalid);
                        log::error!("Discarding unreadable {} queue record: {}", class, e);
                        continue;
                    }
                };

                if job.is_expired_at(Utc::now()) {
                    self.observer.job(JobStatus::Expired);
                    log::info!(
                        "Job {} expired before delivery (expired at {})",
                        job.id,
                        job.expires_at
                    );
                    continue;
                }

                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// Total number of queued jobs across all classes.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Store` if the backing store fails.
    pub async fn size(&self) -> Result<usize, QueueError> {
        let mut total = 0;
        for class in Priority::DRAIN_ORDER {
            total += self.store.len(class).await?;
        }
        Ok(total)
    }
}

/// Result of trying to make room in a full queue.
enum Room {
    /// A victim was popped and must be accounted for
    Evicted(Eviction),
    /// A concurrent dequeue freed a slot
    Freed,
    /// Nothing this priority may evict
    Full,
}

/// A record popped to make room, kept until the admission lands.
struct Eviction {
    class: Priority,
    record: String,
}

impl Eviction {
    fn label(&self) -> String {
        serde_json::from_str::<Job>(&self.record)
            .map(|job| job.id.to_string())
            .unwrap_or_else(|_| "<invalid>".to_string())
    }
}

fn expiry(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

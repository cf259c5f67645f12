//! Job types exchanged at the enqueue boundary and stored in the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum_macros::EnumIter as EnumIterMacro;

/// Priority class of a job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIterMacro,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Drained first; may evict Low, then Normal, when the queue is full
    High,
    /// Drained after High; may evict Low when the queue is full
    Normal,
    /// Drained last; never evicts anything
    Low,
}

impl Priority {
    /// Order in which classes are drained.
    pub const DRAIN_ORDER: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    /// Returns the lowercase label of this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Classes a job of this priority may evict from, in the order tried.
    pub fn preemption_victims(&self) -> &'static [Priority] {
        match self {
            Priority::High => &[Priority::Low, Priority::Normal],
            Priority::Normal => &[Priority::Low],
            Priority::Low => &[],
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An admitted unit of work.
///
/// Jobs are immutable once admitted; the stored form is this struct as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Monotonically increasing id assigned at admission
    pub id: u64,
    /// Key forwarded to the upstream (and used as the cache key)
    pub subject_key: String,
    /// Resolved priority class
    pub priority: Priority,
    /// Admission time
    pub created_at: DateTime<Utc>,
    /// Time after which the job is discarded instead of delivered
    pub expires_at: DateTime<Utc>,
}

impl Job {
    /// Whether the job's TTL has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A request to enqueue a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// Key forwarded to the upstream; required and non-empty
    pub subject_key: String,
    /// Explicit priority hint (`high`, `urgent`, `low`, ...)
    #[serde(default)]
    pub priority: Option<String>,
    /// Request type hint (`update`, `batch`, ...), used when the priority hint
    /// is absent or unrecognized
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl JobRequest {
    /// Creates a request with no hints.
    pub fn new(subject_key: impl Into<String>) -> Self {
        JobRequest {
            subject_key: subject_key.into(),
            ..Default::default()
        }
    }

    /// Sets the priority hint.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Sets the type hint.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Status carried by every `DroppedRecord`.
pub const DROPPED_STATUS: &str = "DROPPED";
/// Reason carried by every `DroppedRecord`.
pub const QUEUE_FULL_REASON: &str = "queue_full";

/// Response handed back when admission is refused.
///
/// This is a normal outcome, not an error: the caller gets it synchronously
/// and nothing is queued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRecord {
    /// Always `None`: no id is assigned to a dropped request
    pub id: Option<u64>,
    /// Always `DROPPED`
    pub status: &'static str,
    /// Always `queue_full`
    pub reason: &'static str,
    /// Priority the request resolved to
    pub priority: Priority,
    /// Zero-confidence payload the caller can use in place of a score
    pub fallback: Value,
}

impl DroppedRecord {
    /// Builds the record for a request of `priority` that could not be admitted.
    pub fn queue_full(priority: Priority) -> Self {
        DroppedRecord {
            id: None,
            status: DROPPED_STATUS,
            reason: QUEUE_FULL_REASON,
            priority,
            fallback: json!({
                "score": null,
                "confidence": 0,
                "source": "fallback",
            }),
        }
    }
}

/// Result of an enqueue attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// The job is in the queue
    Admitted(Job),
    /// The queue was full and the job could not preempt anything
    Dropped(DroppedRecord),
}

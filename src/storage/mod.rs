//! Storage primitives for the queue and the response cache.
//!
//! Queue contents and cache entries live behind two small traits so the same
//! admission and scheduling logic runs against process memory (the default,
//! and what the tests use) or against Redis when several processes should
//! share one queue. Every method is a single atomic operation on the backend;
//! nothing here spans more than one command.

mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::StoreError;
use crate::queue::Priority;

pub use self::redis::RedisStore;
pub use memory::MemoryStore;

/// Per-class FIFO lists plus the job id sequence.
///
/// Records are opaque strings (serialized jobs). `push_back` appends at the
/// insertion end; `pop_front` takes the oldest record; `pop_back` takes the
/// most recently inserted one.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Returns the next job id. Ids start at 1 and never repeat.
    async fn next_id(&self) -> Result<u64, StoreError>;

    /// Appends a record to the tail of a class.
    async fn push_back(&self, class: Priority, record: String) -> Result<(), StoreError>;

    /// Removes and returns the oldest record of a class.
    async fn pop_front(&self, class: Priority) -> Result<Option<String>, StoreError>;

    /// Removes and returns the newest record of a class.
    async fn pop_back(&self, class: Priority) -> Result<Option<String>, StoreError>;

    /// Number of records held by a class.
    async fn len(&self, class: Priority) -> Result<usize, StoreError>;
}

/// Key/value storage with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value for `key` unless it is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key` for `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

/// Redis key of the list that holds one priority class.
pub(crate) fn queue_key(class: Priority) -> String {
    format!("{}{}", crate::config::QUEUE_KEY_PREFIX, class.as_str())
}

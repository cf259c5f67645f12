//! In-process storage backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use tokio::sync::Mutex;

use super::{CacheStore, QueueStore};
use crate::config::{DEFAULT_CACHE_MAX_ENTRIES, MAX_CACHE_TTL_SECS};
use crate::error_handling::StoreError;
use crate::queue::Priority;

/// A cached value together with the lifetime it was stored with.
#[derive(Clone)]
struct CachedValue {
    value: String,
    ttl: Duration,
}

/// Gives every entry the TTL it was written with; a rewrite restarts it.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Queue lists and cache entries held in process memory.
///
/// Each queue operation takes one short lock, which makes it atomic in the
/// same way a single Redis command is. Cache entries live in a bounded `moka`
/// cache: expired entries are evicted by its housekeeping whether or not they
/// are read again, and the entry count never grows past the configured bound.
pub struct MemoryStore {
    sequence: AtomicU64,
    lists: Mutex<HashMap<Priority, VecDeque<String>>>,
    entries: Cache<String, CachedValue>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("sequence", &self.sequence)
            .field("max_entries", &self.entries.policy().max_capacity())
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_MAX_ENTRIES)
    }
}

impl MemoryStore {
    /// Creates an empty store with the default cache bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose cache holds at most `max_entries`.
    pub fn with_cache_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        log::debug!("In-process cache created (max {} entries)", max_entries);

        MemoryStore {
            sequence: AtomicU64::new(0),
            lists: Mutex::new(HashMap::new()),
            entries,
        }
    }

    /// Number of live cache entries, after pending evictions have run.
    pub async fn cached_entries(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn push_back(&self, class: Priority, record: String) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().await;
        lists.entry(class).or_default().push_back(record);
        Ok(())
    }

    async fn pop_front(&self, class: Priority) -> Result<Option<String>, StoreError> {
        let mut lists = self.lists.lock().await;
        Ok(lists.get_mut(&class).and_then(VecDeque::pop_front))
    }

    async fn pop_back(&self, class: Priority) -> Result<Option<String>, StoreError> {
        let mut lists = self.lists.lock().await;
        Ok(lists.get_mut(&class).and_then(VecDeque::pop_back))
    }

    async fn len(&self, class: Priority) -> Result<usize, StoreError> {
        let lists = self.lists.lock().await;
        Ok(lists.get(&class).map_or(0, VecDeque::len))
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl = ttl.min(Duration::from_secs(MAX_CACHE_TTL_SECS));
        self.entries
            .insert(
                key.to_string(),
                CachedValue {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }
}

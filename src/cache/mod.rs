//! Response cache keyed by subject key.
//!
//! Stores the last successful upstream payload per key for a fixed TTL. The
//! cache is best effort: a storage failure is logged and treated as a miss
//! (on read) or ignored (on write), never surfaced to the scheduler.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::CACHE_KEY_PREFIX;
use crate::storage::CacheStore;

/// Cache of upstream responses.
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    /// Creates an enabled cache.
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        ResponseCache {
            store,
            ttl,
            enabled: true,
        }
    }

    /// Creates a cache that always misses and never stores.
    pub fn disabled(store: Arc<dyn CacheStore>) -> Self {
        ResponseCache {
            store,
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    /// Whether lookups and stores reach the backing store.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the cached payload for `subject_key`, if any.
    pub async fn get(&self, subject_key: &str) -> Option<Value> {
        if !self.enabled {
            log::debug!("Cache disabled, skipping lookup");
            return None;
        }

        let key = cache_key(subject_key);
        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    log::debug!("Cache hit for {}", key);
                    Some(value)
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("Cache miss for {}", key);
                None
            }
            Err(e) => {
                log::warn!("Cache read failed for {}, treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Stores `value` for `subject_key` with the configured TTL.
    pub async fn set(&self, subject_key: &str, value: &Value) {
        if !self.enabled {
            log::debug!("Cache disabled, skipping store");
            return;
        }

        let key = cache_key(subject_key);
        let raw = value.to_string();
        match self.store.set_ex(&key, &raw, self.ttl).await {
            Ok(()) => log::debug!("Cached {} for {}s", key, self.ttl.as_secs()),
            Err(e) => log::warn!("Cache write failed for {}: {}", key, e),
        }
    }
}

fn cache_key(subject_key: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, subject_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::StoreError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingStore;

    fn backend_down() -> StoreError {
        StoreError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(backend_down())
        }

        async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(backend_down())
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        assert_eq!(cache.get("123").await, None);

        cache.set("123", &json!({"score": 700})).await;
        assert_eq!(cache.get("123").await, Some(json!({"score": 700})));
        assert_eq!(cache.get("456").await, None);
    }

    #[tokio::test]
    async fn test_entries_use_prefixed_keys() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResponseCache::new(store.clone(), Duration::from_secs(60));
        cache.set("123", &json!({"ok": true})).await;

        let raw = store.get("cache:score:123").await.unwrap();
        assert_eq!(raw.as_deref(), Some(r#"{"ok":true}"#));
    }

    #[tokio::test]
    async fn test_disabled_cache_never_stores_or_hits() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_ex("cache:score:123", "{}", Duration::from_secs(60))
            .await
            .unwrap();

        let cache = ResponseCache::disabled(store.clone());
        assert!(!cache.is_enabled());
        assert_eq!(cache.get("123").await, None);

        cache.set("456", &json!({"ok": true})).await;
        assert_eq!(store.get("cache:score:456").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_miss() {
        let cache = ResponseCache::new(Arc::new(FailingStore), Duration::from_secs(60));
        cache.set("123", &json!({"ok": true})).await;
        assert_eq!(cache.get("123").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), Duration::from_millis(20));
        cache.set("123", &json!(1)).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("123").await, None);
    }
}

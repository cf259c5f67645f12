//! Storage backend selection.

use std::sync::Arc;

use crate::config::Config;
use crate::error_handling::InitializationError;
use crate::storage::{CacheStore, MemoryStore, QueueStore, RedisStore};

/// Handles to the queue and cache storage.
///
/// Both usually point at the same backend instance.
#[derive(Clone)]
pub struct Storage {
    /// Queue lists and id sequence
    pub queue: Arc<dyn QueueStore>,
    /// Response cache entries
    pub cache: Arc<dyn CacheStore>,
}

impl Storage {
    /// Process-local storage with the default cache bound.
    pub fn in_memory() -> Self {
        Self::from_memory(MemoryStore::new())
    }

    fn from_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Storage {
            queue: store.clone(),
            cache: store,
        }
    }
}

/// Connects the storage backend named by the configuration.
///
/// Uses Redis when `redis_url` is set, process memory otherwise.
///
/// # Errors
///
/// Returns `InitializationError::StoreError` if Redis cannot be reached after
/// the connection retries.
pub async fn init_storage(config: &Config) -> Result<Storage, InitializationError> {
    match config.redis_url.as_deref() {
        Some(url) => {
            let store = Arc::new(RedisStore::connect(url).await?);
            Ok(Storage {
                queue: store.clone(),
                cache: store,
            })
        }
        None => {
            log::info!(
                "REDIS_URL not set, using in-process storage (cache bound {} entries)",
                config.cache_max_entries
            );
            Ok(Storage::from_memory(MemoryStore::with_cache_capacity(
                config.cache_max_entries,
            )))
        }
    }
}

//! Proxy resource initialization.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::initialization::{init_client, init_storage, Storage};
use crate::observability::ProxyMetrics;
use crate::queue::PriorityQueue;
use crate::scheduler::{Scheduler, SchedulerSettings};
use crate::upstream::{HttpUpstream, Upstream};

use super::resources::ProxyResources;

/// Initializes all resources needed to run the proxy.
///
/// This function performs the following steps:
/// 1. Validate configuration
/// 2. Connect storage (Redis or in-process)
/// 3. Build the upstream HTTP client
/// 4. Wire metrics, cache, queue and scheduler together
///
/// # Errors
///
/// Returns an error if the configuration is invalid, storage cannot be
/// reached, or the HTTP client cannot be built.
pub async fn init_proxy_resources(config: Config) -> Result<ProxyResources> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let storage = init_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let client = init_client(&config).context("Failed to initialize HTTP client")?;
    let upstream: Arc<dyn Upstream> = Arc::new(HttpUpstream::from_config(client, &config));

    Ok(assemble(config, storage, upstream))
}

/// Wires the proxy around an already-built storage and upstream.
pub fn assemble(config: Config, storage: Storage, upstream: Arc<dyn Upstream>) -> ProxyResources {
    let metrics = Arc::new(ProxyMetrics::new(config.scheduler_interval()));

    let cache = if config.disable_cache {
        log::info!("Response cache disabled");
        ResponseCache::disabled(Arc::clone(&storage.cache))
    } else {
        ResponseCache::new(Arc::clone(&storage.cache), config.cache_ttl())
    };

    let queue = Arc::new(PriorityQueue::new(
        Arc::clone(&storage.queue),
        config.queue_max_size,
        config.job_ttl(),
        metrics.clone(),
    ));

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&queue),
        Arc::new(cache),
        upstream,
        metrics.clone(),
        SchedulerSettings::from_config(&config),
    ));

    ProxyResources {
        config,
        storage,
        metrics,
        queue,
        scheduler,
    }
}

//! Proxy resources.
//!
//! This module defines the `ProxyResources` struct which holds everything a
//! running proxy shares between the scheduler and the front door.

use std::sync::Arc;

use crate::config::Config;
use crate::initialization::Storage;
use crate::observability::ProxyMetrics;
use crate::queue::PriorityQueue;
use crate::scheduler::Scheduler;
use crate::server::AppState;

/// All resources initialized for a proxy process.
pub struct ProxyResources {
    /// Validated configuration
    pub config: Config,
    /// Queue and cache storage handles
    pub storage: Storage,
    /// Metrics registry, also the observer of queue and scheduler
    pub metrics: Arc<ProxyMetrics>,
    /// Admission-controlled queue
    pub queue: Arc<PriorityQueue>,
    /// Drain scheduler
    pub scheduler: Arc<Scheduler>,
}

impl ProxyResources {
    /// State for the front door handlers.
    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.metrics),
            self.config.upstream_query_param.as_str(),
        )
    }
}

//! Graceful shutdown handling.

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::scheduler::SchedulerHandles;

/// Stops the background work of a running proxy.
///
/// The drain timer and the size sampler stop first (an in-flight tick is
/// allowed to finish), then the front door stops accepting requests and
/// drains the ones in flight. Storage is released by the caller afterwards.
///
/// # Errors
///
/// Returns the front door's error if it failed or panicked.
pub async fn shutdown_gracefully(
    scheduler: SchedulerHandles,
    server_shutdown: CancellationToken,
    server_task: Option<JoinHandle<Result<()>>>,
) -> Result<()> {
    scheduler.shutdown().await;
    log::debug!("Scheduler stopped");

    server_shutdown.cancel();
    if let Some(task) = server_task {
        task.await.context("Front door task panicked")??;
    }

    Ok(())
}

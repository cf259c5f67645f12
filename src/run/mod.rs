//! Process bootstrap: build resources, run until Ctrl-C, shut down in order.

mod init;
mod resources;
mod shutdown;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::server;

pub use init::{assemble, init_proxy_resources};
pub use resources::ProxyResources;
pub use shutdown::shutdown_gracefully;

/// Runs the proxy until Ctrl-C.
///
/// Starts the drain loop, the queue-size sampler and the HTTP front door.
/// On Ctrl-C the timers stop first, then the front door, then storage is
/// released.
///
/// # Errors
///
/// Returns an error if initialization fails, the port cannot be bound, or the
/// front door fails while running.
pub async fn run_proxy(config: Config) -> Result<()> {
    let port = config.port;
    let resources = init_proxy_resources(config).await?;
    let listener = server::bind(port).await?;

    let scheduler_handles = resources.scheduler.start();
    let server_shutdown = CancellationToken::new();
    let mut server_task = tokio::spawn(server::serve(
        listener,
        resources.app_state(),
        server_shutdown.clone(),
    ));

    let server_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            log::info!("Shutdown signal received, stopping");
            None
        }
        joined = &mut server_task => Some(joined),
    };

    match server_exit {
        None => {
            shutdown_gracefully(scheduler_handles, server_shutdown, Some(server_task)).await?;
        }
        Some(joined) => {
            log::error!("Front door exited unexpectedly");
            shutdown_gracefully(scheduler_handles, server_shutdown, None).await?;
            joined.context("Front door task panicked")??;
        }
    }

    drop(resources);
    log::info!("score_proxy stopped");
    Ok(())
}

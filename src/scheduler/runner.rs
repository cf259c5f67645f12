//! Background drain loop and queue-size sampler.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Scheduler;

/// Handles to the two background tasks of a running scheduler.
///
/// The drain loop and the sampler stop independently. Stopping waits for the
/// task to exit, so a tick that is already running finishes first.
pub struct SchedulerHandles {
    drain_cancel: CancellationToken,
    sampler_cancel: CancellationToken,
    drain_task: Option<JoinHandle<()>>,
    sampler_task: Option<JoinHandle<()>>,
}

impl SchedulerHandles {
    /// Stops the drain loop and waits for it to exit.
    pub async fn stop_drain(&mut self) {
        self.drain_cancel.cancel();
        if let Some(task) = self.drain_task.take() {
            if let Err(e) = task.await {
                log::error!("Drain loop ended abnormally: {}", e);
            }
        }
    }

    /// Stops the queue-size sampler and waits for it to exit.
    pub async fn stop_sampler(&mut self) {
        self.sampler_cancel.cancel();
        if let Some(task) = self.sampler_task.take() {
            if let Err(e) = task.await {
                log::error!("Queue size sampler ended abnormally: {}", e);
            }
        }
    }

    /// Stops both tasks.
    pub async fn shutdown(mut self) {
        self.stop_drain().await;
        self.stop_sampler().await;
    }

    /// Whether the drain loop is still running.
    pub fn is_draining(&self) -> bool {
        self.drain_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Scheduler {
    /// Spawns the drain loop and the queue-size sampler.
    pub fn start(self: &Arc<Self>) -> SchedulerHandles {
        let drain_cancel = CancellationToken::new();
        let sampler_cancel = CancellationToken::new();

        let drain_task = tokio::spawn(drain_loop(Arc::clone(self), drain_cancel.clone()));
        let sampler_task = tokio::spawn(sample_loop(
            Arc::clone(self),
            self.sample_interval,
            sampler_cancel.clone(),
        ));

        log::info!(
            "Scheduler started (interval {}ms, size sample every {}ms)",
            self.current_interval().as_millis(),
            self.sample_interval.as_millis()
        );

        SchedulerHandles {
            drain_cancel,
            sampler_cancel,
            drain_task: Some(drain_task),
            sampler_task: Some(sampler_task),
        }
    }
}

fn drain_ticker(period: Duration) -> Interval {
    // First tick one period from now, not immediately
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn drain_loop(scheduler: Arc<Scheduler>, cancel: CancellationToken) {
    let mut interval_rx = scheduler.subscribe_interval();
    let mut ticker = drain_ticker(*interval_rx.borrow_and_update());

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Drain loop shutting down");
                break;
            }
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let period = *interval_rx.borrow_and_update();
                ticker = drain_ticker(period);
                log::debug!("Drain timer restarted at {}ms", period.as_millis());
            }
            _ = ticker.tick() => {
                let outcome = scheduler.process_queue().await;
                log::trace!("Tick finished: {:?}", outcome);
            }
        }
    }
}

async fn sample_loop(scheduler: Arc<Scheduler>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Queue size sampler shutting down");
                break;
            }
            _ = ticker.tick() => scheduler.sample_queue_size().await,
        }
    }
}

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use threadwatch_config::AppConfig;
use threadwatch_dispatch::NotificationSink;
use threadwatch_snapshot::SnapshotStore;

use crate::catalog::CatalogSource;
use crate::watcher::Watcher;

/// When cycles run: once immediately, again after `startup_delay`, then
/// every `poll_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub poll_interval: Duration,
    pub startup_delay: Duration,
}

impl Schedule {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            startup_delay: config.startup_delay(),
        }
    }
}

/// Drives `watcher` until `shutdown` flips to `true` or its sender is gone.
///
/// Cycles are awaited inline, so a slow cycle delays the next tick rather
/// than overlapping it; shutdown is observed only between cycles.  Returns
/// the number of cycles started.
pub async fn run_until_shutdown<C, T, S>(
    watcher: &mut Watcher<C, T, S>,
    schedule: Schedule,
    mut shutdown: watch::Receiver<bool>,
) -> usize
where
    C: CatalogSource,
    T: SnapshotStore,
    S: NotificationSink,
{
    let mut cycles = 0usize;

    run_logged(watcher, &mut cycles).await;
    if is_shutdown(&shutdown) {
        return cycles;
    }

    info!(
        delay_secs = schedule.startup_delay.as_secs(),
        "warm-up cycle done, waiting before regular polling"
    );
    tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown) => return cycles,
        _ = tokio::time::sleep(schedule.startup_delay) => {}
    }

    let mut interval = tokio::time::interval_at(Instant::now(), schedule.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = interval.tick() => run_logged(watcher, &mut cycles).await,
        }
    }

    info!(cycles, "watcher stopped");
    cycles
}

async fn run_logged<C, T, S>(watcher: &mut Watcher<C, T, S>, cycles: &mut usize)
where
    C: CatalogSource,
    T: SnapshotStore,
    S: NotificationSink,
{
    *cycles += 1;
    if let Err(err) = watcher.run_cycle().await {
        warn!(cycle = *cycles, error = %format!("{err:#}"), "cycle failed");
    }
}

fn is_shutdown(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow() || rx.has_changed().is_err()
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

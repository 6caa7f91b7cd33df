use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use threadwatch_config::AppConfig;
use threadwatch_discord::DiscordSink;
use threadwatch_runtime::{HttpCatalog, Schedule, Watcher, run_until_shutdown};
use threadwatch_snapshot::{JsonlSnapshotStore, StoreLock};

type LiveWatcher = Watcher<HttpCatalog, JsonlSnapshotStore, DiscordSink>;

pub(crate) async fn run_watch(config: AppConfig) -> Result<()> {
    let (_lock, mut watcher) = prepare(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = shutdown_signal().await {
            warn!(error = %err, "signal handler failed, shutting down");
        } else {
            info!("shutdown requested, stopping after the current cycle");
        }
        let _ = shutdown_tx.send(true);
    });

    info!(
        board = %config.watch.board,
        keywords = config.watch.keywords.len(),
        interval_secs = config.watch.poll_interval_secs,
        snapshot = %config.snapshot.path,
        "threadwatch started"
    );
    let schedule = Schedule::from_config(&config);
    let cycles = run_until_shutdown(&mut watcher, schedule, shutdown_rx).await;
    info!(cycles, "threadwatch stopped");
    Ok(())
}

pub(crate) async fn run_once(config: AppConfig) -> Result<()> {
    let (_lock, mut watcher) = prepare(&config)?;
    let report = watcher.run_cycle().await?;
    println!("{report}");
    Ok(())
}

/// Validates config, takes the store lock and wires the live collaborators.
fn prepare(config: &AppConfig) -> Result<(StoreLock, LiveWatcher)> {
    config.validate()?;

    let store = JsonlSnapshotStore::new(config.snapshot_path());
    let lock = store
        .lock()
        .context("another threadwatch instance is using this snapshot")?;

    let catalog = HttpCatalog::new(
        &config.watch.api_base,
        &config.watch.board,
        config.request_timeout(),
    )
    .context("failed to build catalog client")?;

    let sink = DiscordSink::new(
        config.discord.bot_token.as_str(),
        config.discord.new_thread_channel_id.as_str(),
        config.discord.update_channel_id.as_str(),
        config.request_timeout(),
    )
    .context("discord sink is not usable")?
    .with_api_base(config.discord.api_base.as_str());

    let watcher = Watcher::from_config(config, catalog, store, sink)?;
    Ok((lock, watcher))
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

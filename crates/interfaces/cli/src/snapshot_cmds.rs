use anyhow::{Context, Result};
use chrono::DateTime;

use threadwatch_config::AppConfig;
use threadwatch_core::Thread;
use threadwatch_snapshot::{JsonlSnapshotStore, SnapshotStore};

pub(crate) fn run_snapshot_show(config: &AppConfig, limit: usize) -> Result<()> {
    let store = JsonlSnapshotStore::new(config.snapshot_path());
    let generation = store.load().context("failed to load snapshot")?;

    println!("── snapshot ─────────────────────────────────────────");
    println!("  path    : {}", store.path().display());
    match store.header()? {
        Some(header) => println!(
            "  saved   : {} (format {} v{})",
            header.saved_at.to_rfc3339(),
            header.format,
            header.version
        ),
        None => println!("  saved   : (no header)"),
    }
    println!("  threads : {}", generation.len());

    if generation.is_empty() {
        return Ok(());
    }
    println!();
    for thread in generation.iter().take(limit) {
        println!("{}", thread_line(thread));
    }
    if generation.len() > limit {
        println!("  ... {} more", generation.len() - limit);
    }
    Ok(())
}

pub(crate) fn run_snapshot_sanitize(config: &AppConfig) -> Result<()> {
    let store = JsonlSnapshotStore::new(config.snapshot_path());
    let _lock = store
        .lock()
        .context("a running watcher holds the snapshot; stop it before sanitizing")?;

    let report = store.sanitize().context("snapshot sanitization failed")?;
    if !report.rewritten {
        println!("snapshot is clean: {} records", report.kept);
        return Ok(());
    }
    println!(
        "snapshot sanitized: kept {} records, dropped {} lines{}",
        report.kept,
        report.dropped,
        if report.header_restored { ", header restored" } else { "" }
    );
    if report.dropped > 0 {
        println!("dropped lines appended to {}", store.corrupt_path().display());
    }
    Ok(())
}

fn thread_line(thread: &Thread) -> String {
    let modified = DateTime::from_timestamp(thread.last_modified, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| thread.last_modified.to_string());
    format!(
        "  [{}] {}  replies={:<4} {}",
        thread.id,
        modified,
        thread.reply_count,
        if thread.subject.is_empty() { "(no subject)" } else { thread.subject.as_str() }
    )
}

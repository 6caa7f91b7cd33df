mod snapshot_cmds;
mod watch;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use threadwatch_config::{AppConfig, DEFAULT_CONFIG_PATH};

#[derive(Debug, Parser)]
#[command(
    name = "threadwatch",
    version,
    about = "Watches a board catalog and announces new and updated threads"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll forever (default).
    Run,
    /// Run a single cycle and print its report.
    Once,
    /// Validate the config and print the effective values.
    CheckConfig,
    /// Inspect or repair the persisted snapshot.
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
}

#[derive(Debug, Subcommand)]
enum SnapshotCommands {
    /// List persisted threads.
    Show {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Drop malformed lines from the snapshot file.
    Sanitize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    let _log_guard = init_tracing(&config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => watch::run_watch(config).await?,
        Commands::Once => watch::run_once(config).await?,
        Commands::CheckConfig => check_config(&config, &cli.config)?,
        Commands::Snapshot { command } => match command {
            SnapshotCommands::Show { limit } => snapshot_cmds::run_snapshot_show(&config, limit)?,
            SnapshotCommands::Sanitize => snapshot_cmds::run_snapshot_sanitize(&config)?,
        },
    }

    Ok(())
}

/// `RUST_LOG` wins over `telemetry.log_level`.  With a log dir set, output
/// goes to a daily-rolling file instead of stderr; the returned guard must
/// live until exit so buffered lines are flushed.
fn init_tracing(config: &AppConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));

    let Some(dir) = config.log_dir() else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log dir {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(&dir, "threadwatch.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

fn check_config(config: &AppConfig, path: &Path) -> Result<()> {
    config.validate()?;

    println!("── threadwatch config ───────────────────────────────");
    println!(
        "  source          : {}{}",
        path.display(),
        if path.exists() { "" } else { " (missing, defaults in use)" }
    );
    println!("  keywords        : {}", config.watch.keywords.len());
    println!(
        "  discord         : {}",
        if config.discord.is_configured() { "configured" } else { "NOT configured" }
    );
    println!();
    print!("{}", config.redacted().to_toml()?);
    Ok(())
}

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/threadwatch.toml";

pub const ENV_DISCORD_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_KEYWORDS: &str = "THREADWATCH_KEYWORDS";

// ── Sections ─────────────────────────────────────────────────────────────────

/// What to poll and how often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub board: String,
    /// Case-insensitive substrings; a thread must mention one to be tracked.
    pub keywords: Vec<String>,
    pub poll_interval_secs: u64,
    /// Pause between the first cycle and the regular interval.
    pub startup_delay_secs: u64,
    pub max_text_len: usize,
    pub api_base: String,
    pub thread_base: String,
    pub request_timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            board: "biz".to_string(),
            keywords: Vec::new(),
            poll_interval_secs: 300,
            startup_delay_secs: 60,
            max_text_len: 500,
            api_base: "https://a.4cdn.org".to_string(),
            thread_base: "https://boards.4channel.org".to_string(),
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: ".threadwatch/threads.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Announced thread ids remembered for the process lifetime.
    pub dedupe_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dedupe_capacity: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Overridden by `DISCORD_BOT_TOKEN` when set.
    pub bot_token: String,
    pub new_thread_channel_id: String,
    pub update_channel_id: String,
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            new_thread_channel_id: String::new(),
            update_channel_id: String::new(),
            api_base: "https://discord.com/api/v10".to_string(),
        }
    }
}

impl DiscordConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty()
            && !self.new_thread_channel_id.trim().is_empty()
            && !self.update_channel_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Directory for daily-rolling log files; empty logs to stderr only.
    pub log_dir: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub snapshot: SnapshotConfig,
    pub dispatch: DispatchConfig,
    pub discord: DiscordConfig,
    pub telemetry: TelemetryConfig,
}

// ── Loading ──────────────────────────────────────────────────────────────────

impl AppConfig {
    /// File contents plus env overrides.  A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// File contents only.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read config file {}", path.display()))
            }
        }
    }

    /// Applies the documented overrides using `lookup` to read variables.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_DISCORD_BOT_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.discord.bot_token = token.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_KEYWORDS).filter(|v| !v.trim().is_empty()) {
            self.watch.keywords = raw
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.board.trim().is_empty() {
            bail!("watch.board must not be empty");
        }
        if self.watch.poll_interval_secs == 0 {
            bail!("watch.poll_interval_secs must be greater than zero");
        }
        if self.watch.max_text_len == 0 {
            bail!("watch.max_text_len must be greater than zero");
        }
        if self.dispatch.dedupe_capacity == 0 {
            bail!("dispatch.dedupe_capacity must be greater than zero");
        }
        Ok(())
    }

    /// Copy that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.discord.bot_token.is_empty() {
            copy.discord.bot_token = "<redacted>".to_string();
        }
        copy
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.watch.poll_interval_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.watch.startup_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.watch.request_timeout_secs)
    }

    pub fn dedupe_capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.dispatch.dedupe_capacity)
            .context("dispatch.dedupe_capacity must be greater than zero")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.snapshot.path)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        let dir = self.telemetry.log_dir.trim();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

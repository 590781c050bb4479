use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::event::DaemonEvent;

pub const MIN_POLL_INTERVAL_SECS: u64 = 1;
pub const MAX_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

pub const DEFAULT_GAME_LIMIT_MINUTES: u32 = 45;
pub const DEFAULT_LEISURE_LIMIT_MINUTES: u32 = 30;
pub const DEFAULT_LIMIT_MINUTES: u32 = 60;

/// Root configuration structure. Deserialized from %APPDATA%\Mindfulness\config.toml.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub limits: TimeLimits,
}

/// Settings for the process lifecycle monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between process-table polls. Clamped to [1, 60].
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl MonitorConfig {
    /// Returns the poll interval clamped to its supported range.
    pub fn effective_poll_interval_secs(&self) -> u64 {
        self.poll_interval_secs
            .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS)
    }
}

/// Per-category session time limits in minutes, used when an application has
/// no positive custom limit of its own.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeLimits {
    #[serde(default = "default_game_limit")]
    pub game: u32,
    #[serde(default = "default_leisure_limit")]
    pub leisure: u32,
    /// Global fallback for every category without a dedicated default.
    #[serde(default = "default_limit", rename = "default")]
    pub fallback: u32,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            game: DEFAULT_GAME_LIMIT_MINUTES,
            leisure: DEFAULT_LEISURE_LIMIT_MINUTES,
            fallback: DEFAULT_LIMIT_MINUTES,
        }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("Failed to create config file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            log::warn!("Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        log::warn!("Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("Failed to reload config: {e}"),
            }
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_game_limit() -> u32 {
    DEFAULT_GAME_LIMIT_MINUTES
}

fn default_leisure_limit() -> u32 {
    DEFAULT_LEISURE_LIMIT_MINUTES
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT_MINUTES
}

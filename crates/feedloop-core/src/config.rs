use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::feed::{FeedDiscovery, FileFeedIdStore};
use crate::retry::{Backoff, BackoffKind, Jitter, RetryPolicy};

/// Retry policy parameters (optional sections in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first). Absent = unbounded.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Delay in seconds after the first failure (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Growth factor for exponential backoff.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// "fixed", "linear" or "exponential" (default).
    #[serde(default)]
    pub backoff: BackoffKind,
    /// "none" (default), "full" or "equal".
    #[serde(default)]
    pub jitter: Jitter,
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            base_delay_secs: 0.5,
            max_delay_secs: 300,
            multiplier: default_multiplier(),
            backoff: BackoffKind::Exponential,
            jitter: Jitter::None,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        let base = if self.base_delay_secs.is_finite() && self.base_delay_secs > 0.0 {
            Duration::from_secs_f64(self.base_delay_secs)
        } else {
            Duration::ZERO
        };
        RetryPolicy {
            max_attempts: self.max_attempts.map(|n| n.max(1)),
            backoff: Backoff {
                kind: self.backoff,
                base_delay: base,
                max_delay: Duration::from_secs(self.max_delay_secs),
                multiplier: self.multiplier,
                jitter: self.jitter,
            },
        }
    }
}

/// Feed service generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatafeedVersion {
    /// No list call: the feed id is persisted in `id_file_path`.
    V1,
    /// Feeds are listed by the service.
    #[default]
    V2,
}

/// Feed-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatafeedConfig {
    #[serde(default)]
    pub version: DatafeedVersion,
    /// v1 only. Defaults to `$XDG_STATE_HOME/feedloop/datafeed.id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_file_path: Option<PathBuf>,
    /// Retry policy for reads; if missing, reads retry forever with the
    /// default backoff.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl DatafeedConfig {
    pub fn discovery(&self) -> Result<FeedDiscovery> {
        match self.version {
            DatafeedVersion::V2 => Ok(FeedDiscovery::Listed),
            DatafeedVersion::V1 => {
                let path = match &self.id_file_path {
                    Some(path) => path.clone(),
                    None => FileFeedIdStore::default_path()?,
                };
                Ok(FeedDiscovery::Stored(Arc::new(FileFeedIdStore::new(path))))
            }
        }
    }
}

/// Global configuration loaded from `~/.config/feedloop/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedLoopConfig {
    /// Username of the bot; its own events are ignored by default listeners.
    #[serde(default)]
    pub bot_username: Option<String>,
    /// Retry policy for feed list/create/delete; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub datafeed: DatafeedConfig,
}

impl FeedLoopConfig {
    pub fn lifecycle_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }

    pub fn read_policy(&self) -> RetryPolicy {
        self.datafeed
            .retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_else(RetryPolicy::unbounded)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("feedloop")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FeedLoopConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FeedLoopConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<FeedLoopConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: FeedLoopConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

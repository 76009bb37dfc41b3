//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Work/break durations and the reward rate
//! - Sync pacing (periodic interval, cache TTL, retry backoff)
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/blackreaper/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::store::data_dir;
use crate::sync::RetryPolicy;

/// Timer durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_duration")]
    pub work_duration_min: u32,
    #[serde(default = "default_break_duration")]
    pub break_duration_min: u32,
}

/// Reward rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// RC cells awarded per planned minute of a completed work session.
    #[serde(default = "default_rc_per_work_minute")]
    pub rc_per_work_minute: i64,
    /// RC cells awarded for completing a task.
    #[serde(default = "default_rc_per_task")]
    pub rc_per_task: i64,
}

/// Sync pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fallback replay interval in seconds.
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// How long a cached read stays authoritative.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// First retry delay after a transient replay failure.
    #[serde(default = "default_retry_base")]
    pub retry_base_secs: u64,
    /// Backoff ceiling.
    #[serde(default = "default_retry_max")]
    pub retry_max_secs: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/blackreaper/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub reward: RewardConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_work_duration() -> u32 {
    25
}
fn default_break_duration() -> u32 {
    5
}
fn default_rc_per_work_minute() -> i64 {
    1
}
fn default_rc_per_task() -> i64 {
    10
}
fn default_sync_interval() -> u64 {
    60
}
fn default_cache_ttl() -> u64 {
    5 * 60
}
fn default_retry_base() -> u64 {
    30
}
fn default_retry_max() -> u64 {
    15 * 60
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_duration_min: default_work_duration(),
            break_duration_min: default_break_duration(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            rc_per_work_minute: default_rc_per_work_minute(),
            rc_per_task: default_rc_per_task(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
            cache_ttl_secs: default_cache_ttl(),
            retry_base_secs: default_retry_base(),
            retry_max_secs: default_retry_max(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            reward: RewardConfig::default(),
            sync: SyncConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/blackreaper"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file is
    /// missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    /// Load the configuration from a specific path (for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Write the configuration back to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    /// Write the configuration to a specific path (for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // ── Derived values ───────────────────────────────────────────────

    pub fn work_secs(&self) -> u64 {
        u64::from(self.timer.work_duration_min) * 60
    }

    pub fn break_secs(&self) -> u64 {
        u64::from(self.timer.break_duration_min) * 60
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.sync.cache_ttl_secs as i64)
    }

    pub fn sync_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sync.interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            chrono::Duration::seconds(self.sync.retry_base_secs as i64),
            chrono::Duration::seconds(self.sync.retry_max_secs as i64),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_design() {
        let config = Config::default();
        assert_eq!(config.timer.work_duration_min, 25);
        assert_eq!(config.timer.break_duration_min, 5);
        assert_eq!(config.sync.interval_secs, 60);
        assert_eq!(config.sync.cache_ttl_secs, 300);
        assert_eq!(config.reward.rc_per_work_minute, 1);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [timer]
            work_duration_min = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.timer.work_duration_min, 50);
        assert_eq!(config.timer.break_duration_min, 5);
        assert_eq!(config.sync.cache_ttl_secs, 300);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.timer.work_duration_min = 45;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timer.work_duration_min, 45);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded.timer.work_duration_min, 25);
    }
}

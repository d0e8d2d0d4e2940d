//! Daemon configuration loaded from a TOML file
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! usable configuration that monitors nothing.

use crate::config::sites::{validate_monitors, EnvLookup, MonitorSource, SiteList};
use crate::error::ConfigError;
use crate::records::Monitor;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding a JSON site list, re-read on every sweep
pub const MONITOR_CONFIG_ENV: &str = "MONITOR_CONFIG_JSON";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Optional JSON file with the site list, re-read on every sweep
    pub monitors_file: Option<PathBuf>,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub probe: ProbeConfig,
    pub schedule: ScheduleConfig,
    pub dashboard: DashboardConfig,
    pub notify: NotifyConfig,
    pub auth: AuthConfig,
    /// Inline `[[monitors]]` tables
    pub monitors: Vec<Monitor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; ":memory:" keeps history in memory only
    pub path: String,
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "upwatch.db".to_string(),
            retention_days: 35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: format!("upwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_seconds: u64,
    /// Upper bound for one scheduled sweep, 0 disables it
    pub sweep_timeout_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            sweep_timeout_seconds: 900,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Offset from UTC used to label hour buckets
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl TelegramConfig {
    /// Both the bot token and the chat id are present
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret for the login form; empty leaves every route open
    pub password: String,
}

impl AuthConfig {
    pub fn is_enabled(&self) -> bool {
        !self.password.is_empty()
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, or a parse
    /// or validation error if its content is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    ///
    /// Recognized variables: `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` and
    /// `UPWATCH_PASSWORD`. `MONITOR_CONFIG_JSON` is handled by
    /// [`Config::monitor_source`] because it is re-read on every sweep.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.notify.telegram.bot_token = token;
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.notify.telegram.chat_id = chat_id;
        }
        if let Some(password) = lookup("UPWATCH_PASSWORD") {
            self.auth.password = password;
        }
    }

    /// Validate value ranges and the inline monitor list
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "probe.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.schedule.interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "schedule.interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.storage.retention_days == 0 {
            return Err(ConfigError::ValidationError(
                "storage.retention_days must be greater than 0".to_string(),
            ));
        }
        if !(-14..=14).contains(&self.dashboard.utc_offset_hours) {
            return Err(ConfigError::ValidationError(format!(
                "dashboard.utc_offset_hours must be within -14..=14, got {}",
                self.dashboard.utc_offset_hours
            )));
        }
        validate_monitors(&self.monitors)
    }

    /// Pick the monitor list provider
    ///
    /// `MONITOR_CONFIG_JSON` wins when `lookup` finds it at startup, then
    /// `monitors_file`, then the inline `[[monitors]]` tables. The variable is
    /// read again through `lookup` on every sweep.
    pub fn monitor_source(&self, lookup: EnvLookup) -> Arc<dyn MonitorSource> {
        if lookup(MONITOR_CONFIG_ENV).is_some() {
            Arc::new(SiteList::env_var(MONITOR_CONFIG_ENV, lookup))
        } else if let Some(ref path) = self.monitors_file {
            Arc::new(SiteList::JsonFile(path.clone()))
        } else {
            Arc::new(SiteList::Inline(self.monitors.clone()))
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_seconds)
    }

    pub fn sweep_timeout(&self) -> Option<Duration> {
        match self.schedule.sweep_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Records older than this many seconds are pruned after each sweep
    pub fn retention_seconds(&self) -> i64 {
        i64::from(self.storage.retention_days) * 24 * 3600
    }

    /// Zone used to cut hour buckets, UTC if the offset is out of range
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.dashboard.utc_offset_hours * 3600).unwrap_or(Utc.fix())
    }
}

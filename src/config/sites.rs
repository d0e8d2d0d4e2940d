//! Monitor list providers
//!
//! The site list is re-read at the start of every sweep so operators can edit
//! it without restarting the daemon. A list that cannot be read or parsed fails
//! the sweep as a whole.

use crate::error::ConfigError;
use crate::records::Monitor;
use reqwest::Url;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Reads one environment variable by name
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup backed by the process environment
pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok())
}

/// Provides the ordered list of monitors for a sweep
pub trait MonitorSource: Send + Sync {
    /// Load and validate the current monitor list
    fn load(&self) -> Result<Vec<Monitor>, ConfigError>;

    /// Short human-readable description of where monitors come from
    fn describe(&self) -> String;
}

/// Where the monitor list lives
#[derive(Clone)]
pub enum SiteList {
    /// `[[monitors]]` tables from the config file
    Inline(Vec<Monitor>),
    /// A JSON file holding an array of `{name, url}`
    JsonFile(PathBuf),
    /// An environment variable holding a JSON array of `{name, url}`
    EnvVar { var: String, lookup: EnvLookup },
}

impl SiteList {
    pub fn env_var(var: &str, lookup: EnvLookup) -> Self {
        SiteList::EnvVar {
            var: var.to_string(),
            lookup,
        }
    }
}

impl fmt::Debug for SiteList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteList::Inline(monitors) => f.debug_tuple("Inline").field(monitors).finish(),
            SiteList::JsonFile(path) => f.debug_tuple("JsonFile").field(path).finish(),
            SiteList::EnvVar { var, .. } => f.debug_struct("EnvVar").field("var", var).finish(),
        }
    }
}

impl MonitorSource for SiteList {
    fn load(&self) -> Result<Vec<Monitor>, ConfigError> {
        match self {
            SiteList::Inline(monitors) => {
                validate_monitors(monitors)?;
                Ok(monitors.clone())
            }
            SiteList::JsonFile(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ConfigError::ReadError(format!("{}: {}", path.display(), e))
                })?;
                parse_site_list(&raw)
            }
            SiteList::EnvVar { var, lookup } => {
                let raw = lookup(var)
                    .ok_or_else(|| ConfigError::ReadError(format!("{} is not set", var)))?;
                parse_site_list(&raw)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            SiteList::Inline(monitors) => format!("{} inline monitors", monitors.len()),
            SiteList::JsonFile(path) => format!("file {}", path.display()),
            SiteList::EnvVar { var, .. } => format!("environment variable {}", var),
        }
    }
}

/// Parse a JSON array of `{name, url}` objects into monitors
///
/// # Errors
///
/// Returns `ConfigError::ParseError` if the text is not a JSON array of
/// monitors, or `ConfigError::ValidationError` if a monitor is invalid.
pub fn parse_site_list(raw: &str) -> Result<Vec<Monitor>, ConfigError> {
    let monitors: Vec<Monitor> = serde_json::from_str(raw.trim()).map_err(|e| {
        ConfigError::ParseError(format!("site list is not a JSON array of {{name, url}}: {}", e))
    })?;
    validate_monitors(&monitors)?;
    Ok(monitors)
}

/// Check that names are non-empty and unique and that URLs are http(s)
pub fn validate_monitors(monitors: &[Monitor]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for monitor in monitors {
        if monitor.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "monitor with url '{}' has an empty name",
                monitor.url
            )));
        }

        if !seen.insert(monitor.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate monitor name '{}'",
                monitor.name
            )));
        }

        let url = Url::parse(&monitor.url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "monitor '{}' has an invalid url '{}': {}",
                monitor.name, monitor.url, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::ValidationError(format!(
                "monitor '{}' must use http or https, got '{}'",
                monitor.name,
                url.scheme()
            )));
        }
    }

    Ok(())
}

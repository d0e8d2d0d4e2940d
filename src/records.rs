//! Core record types for the uptime monitor
//!
//! This module defines the data structures shared by the probe engine, the
//! history store, the orchestrator and the HTTP surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Unix timestamp in whole seconds
pub type Timestamp = i64;

/// Observed availability of a monitored site
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The site answered with HTTP 200
    Up,
    /// The site answered with another status, or did not answer at all
    Down,
    /// No observation has been recorded yet
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "up",
            Status::Down => "down",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Status::Up),
            "down" => Ok(Status::Down),
            "unknown" => Ok(Status::Unknown),
            other => Err(format!("unrecognized status '{}'", other)),
        }
    }
}

/// A named URL to probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Monitor {
    /// Unique display name, also the query key for history
    pub name: String,
    /// URL fetched with a GET request on every sweep
    pub url: String,
}

impl Monitor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// What started a sweep
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// The periodic timer
    Scheduled,
    /// An operator hitting the manual check endpoint
    Manual,
}

impl TriggerSource {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, TriggerSource::Scheduled)
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::Scheduled => f.write_str("scheduled"),
            TriggerSource::Manual => f.write_str("manual"),
        }
    }
}

/// One persisted observation of one monitor
///
/// Records are immutable once written. Newer records with the same `name`
/// supersede older ones; the retention sweep deletes them in bulk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRecord {
    pub name: String,
    pub status: Status,
    /// HTTP status code, 0 when no response was received
    pub status_code: u16,
    pub timestamp: Timestamp,
    /// True when the periodic timer triggered the sweep
    pub scheduled: bool,
    pub duration_ms: u64,
    /// "timeout" or the transport error text when the request failed
    pub error_detail: Option<String>,
}

/// Public view of a record returned by the log query endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub name: String,
    pub status: Status,
    pub timestamp: Timestamp,
    pub scheduled: bool,
    pub duration_ms: u64,
}

impl From<CheckRecord> for LogEntry {
    fn from(record: CheckRecord) -> Self {
        Self {
            name: record.name,
            status: record.status,
            timestamp: record.timestamp,
            scheduled: record.scheduled,
            duration_ms: record.duration_ms,
        }
    }
}

/// Per-monitor outcome of a sweep, returned by the manual trigger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    pub name: String,
    pub status: Status,
    pub status_code: u16,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

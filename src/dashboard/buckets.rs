//! Hourly status bars
//!
//! Groups a monitor's records into calendar hours and classifies each hour:
//! `ok` when every check was up, `fail` when any check was not, `empty` when
//! nothing was recorded.

use crate::error::StorageError;
use crate::history::{HistoryStore, HourBucket, LogQuery, HOUR};
use crate::records::{CheckRecord, Status, Timestamp};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Never render more than 30 days of bars
pub const MAX_BARS: usize = 30 * 24;

/// Hours shown when the whole history is requested but there is none
const EMPTY_ALL_RANGE_HOURS: usize = 24;

/// How far back the dashboard looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    /// The last N hours
    Hours(u32),
    /// Everything in the store
    All,
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Hours(24)
    }
}

impl TimeRange {
    /// Ranges offered in the dashboard selector
    pub const CHOICES: [TimeRange; 4] = [
        TimeRange::Hours(24),
        TimeRange::Hours(168),
        TimeRange::Hours(336),
        TimeRange::All,
    ];

    pub fn label(&self) -> String {
        match self {
            TimeRange::Hours(24) => "Last 24 hours".to_string(),
            TimeRange::Hours(168) => "Last 7 days".to_string(),
            TimeRange::Hours(336) => "Last 14 days".to_string(),
            TimeRange::Hours(hours) => format!("Last {} hours", hours),
            TimeRange::All => "All data".to_string(),
        }
    }

    /// Query fetching the records this range covers for `name`
    pub fn query(&self, name: &str, now: Timestamp) -> LogQuery {
        let from = match self {
            TimeRange::Hours(hours) => now - i64::from(*hours) * HOUR,
            TimeRange::All => 0,
        };
        LogQuery::for_name(name).between(from, now)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Hours(hours) => write!(f, "{}", hours),
            TimeRange::All => f.write_str("all"),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(TimeRange::All);
        }
        match s.parse::<u32>() {
            Ok(hours) if hours > 0 => Ok(TimeRange::Hours(hours)),
            _ => Err(format!(
                "invalid range '{}', expected a positive number of hours or 'all'",
                s
            )),
        }
    }
}

/// Classification of one hour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Ok,
    Fail,
    Empty,
}

impl Cell {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cell::Ok => "ok",
            Cell::Fail => "fail",
            Cell::Empty => "empty",
        }
    }
}

/// One hour of one monitor's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourBar {
    /// `YYYY-MM-DD HH` token, usable as the `time` filter of the log query
    pub hour: String,
    pub start: Timestamp,
    pub cell: Cell,
    pub checks: usize,
}

/// Number of bars to draw for `range`
fn bar_count(records: &[CheckRecord], range: TimeRange) -> usize {
    let hours = match range {
        TimeRange::Hours(hours) => hours as usize,
        TimeRange::All => {
            let oldest = records.iter().map(|r| r.timestamp).min();
            let newest = records.iter().map(|r| r.timestamp).max();
            match (oldest, newest) {
                (Some(oldest), Some(newest)) => {
                    let span = (newest - oldest) as u64;
                    (span.div_ceil(HOUR as u64) as usize).max(1)
                }
                _ => EMPTY_ALL_RANGE_HOURS,
            }
        }
    };
    hours.min(MAX_BARS)
}

/// Lay `records` out as hourly bars ending with the hour containing `now`
///
/// # Arguments
///
/// * `records` - Records of a single monitor, in any order
/// * `range` - How many hours to cover
/// * `now` - Current time; the last bar is the hour containing it
/// * `offset` - Zone used to cut calendar hours
///
/// # Returns
///
/// Bars ordered oldest first
pub fn hourly_bars(
    records: &[CheckRecord],
    range: TimeRange,
    now: Timestamp,
    offset: FixedOffset,
) -> Vec<HourBar> {
    let mut by_hour: BTreeMap<Timestamp, Vec<Status>> = BTreeMap::new();
    for record in records {
        by_hour
            .entry(HourBucket::containing(record.timestamp, offset).start())
            .or_default()
            .push(record.status);
    }

    let count = bar_count(records, range);
    let mut bucket = HourBucket::containing(now, offset);
    let mut bars = Vec::with_capacity(count);

    for _ in 0..count {
        let statuses = by_hour.get(&bucket.start()).map(Vec::as_slice).unwrap_or(&[]);
        let cell = if statuses.is_empty() {
            Cell::Empty
        } else if statuses.iter().any(|s| *s != Status::Up) {
            Cell::Fail
        } else {
            Cell::Ok
        };

        bars.push(HourBar {
            hour: bucket.token(offset),
            start: bucket.start(),
            cell,
            checks: statuses.len(),
        });
        bucket = bucket.previous();
    }

    bars.reverse();
    bars
}

/// Fetch a monitor's records for `range` and lay them out as hourly bars
///
/// # Errors
///
/// Returns `StorageError` if the history query fails.
pub async fn monitor_bars(
    store: &dyn HistoryStore,
    name: &str,
    range: TimeRange,
    now: Timestamp,
    offset: FixedOffset,
) -> Result<Vec<HourBar>, StorageError> {
    let query = range.query(name, now).resolve(now);
    let records = store.query(&query).await?;
    Ok(hourly_bars(&records, range, now, offset))
}

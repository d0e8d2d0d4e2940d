//! Log query filters and hour buckets
//!
//! Filter precedence: an hour bucket wins over `from`/`to`; `from`/`to` apply
//! only when both are present; a query with no name and no time filter at all
//! defaults to the last hour. The name filter composes with any time filter.

use crate::records::{CheckRecord, Timestamp};
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Seconds in one hour bucket
pub const HOUR: i64 = 3600;

/// Result ordering by timestamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

/// One calendar hour in a fixed UTC offset, written `YYYY-MM-DD HH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HourBucket {
    start: Timestamp,
}

impl HourBucket {
    /// Bucket containing `timestamp`
    pub fn containing(timestamp: Timestamp, offset: FixedOffset) -> Self {
        let local = timestamp + i64::from(offset.local_minus_utc());
        Self {
            start: timestamp - local.rem_euclid(HOUR),
        }
    }

    /// Parse a `YYYY-MM-DD HH` token interpreted in `offset`
    pub fn parse(token: &str, offset: FixedOffset) -> Result<Self, String> {
        let naive = NaiveDateTime::parse_from_str(
            &format!("{}:00:00", token.trim()),
            "%Y-%m-%d %H:%M:%S",
        )
        .map_err(|e| format!("invalid hour bucket '{}', expected YYYY-MM-DD HH: {}", token, e))?;

        let local = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| format!("hour bucket '{}' is ambiguous", token))?;

        Ok(Self {
            start: local.timestamp(),
        })
    }

    /// First second of the bucket
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// First second after the bucket
    pub fn end(&self) -> Timestamp {
        self.start + HOUR
    }

    /// Bucket immediately before this one
    pub fn previous(&self) -> Self {
        Self {
            start: self.start - HOUR,
        }
    }

    /// Token for this bucket in `offset`
    pub fn token(&self, offset: FixedOffset) -> String {
        match offset.timestamp_opt(self.start, 0).single() {
            Some(local) => local.format("%Y-%m-%d %H").to_string(),
            None => self.start.to_string(),
        }
    }
}

/// Filters accepted by the log query interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub name: Option<String>,
    pub bucket: Option<HourBucket>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    /// Maximum number of records, 0 for no limit
    pub limit: usize,
    /// Explicit ordering, otherwise chosen by [`LogQuery::resolve`]
    pub order: Option<Order>,
}

impl LogQuery {
    pub fn for_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Restrict to the inclusive range `[from, to]`
    pub fn between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn in_bucket(mut self, bucket: HourBucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Turn the filters into concrete bounds relative to `now`
    ///
    /// Range and bucket queries default to ascending order, everything else
    /// to newest first.
    pub fn resolve(&self, now: Timestamp) -> ResolvedQuery {
        let (since, until, ranged) = if let Some(bucket) = self.bucket {
            (Some(bucket.start()), Some(bucket.end() - 1), true)
        } else if let (Some(from), Some(to)) = (self.from, self.to) {
            (Some(from), Some(to), true)
        } else if self.name.is_none() && self.from.is_none() && self.to.is_none() {
            (Some(now - HOUR), None, false)
        } else {
            (None, None, false)
        };

        let default_order = if ranged { Order::Asc } else { Order::Desc };

        ResolvedQuery {
            name: self.name.clone(),
            since,
            until,
            order: self.order.unwrap_or(default_order),
            limit: self.limit,
        }
    }
}

/// Query with concrete inclusive time bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub name: Option<String>,
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub order: Order,
    pub limit: usize,
}

impl ResolvedQuery {
    /// Whether `record` passes the name and time filters
    pub fn matches(&self, record: &CheckRecord) -> bool {
        self.name.as_ref().map_or(true, |name| *name == record.name)
            && self.since.map_or(true, |since| record.timestamp >= since)
            && self.until.map_or(true, |until| record.timestamp <= until)
    }
}

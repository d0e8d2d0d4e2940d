//! Append-only history of check records
//!
//! The orchestrator is the only writer. Dashboard and API readers may run
//! concurrently with a sweep and can observe a cycle half-written.

use crate::error::StorageError;
use crate::records::{CheckRecord, Status, Timestamp};
use std::future::Future;
use std::pin::Pin;

/// Query filters and hour buckets
pub mod query;

/// SQLite schema
pub mod schema;

/// SQLite-backed store
pub mod sqlite;

pub use query::{HourBucket, LogQuery, Order, ResolvedQuery, HOUR};
pub use sqlite::SqliteHistory;

/// Boxed future returned by [`HistoryStore`] operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Trait for check history backends
pub trait HistoryStore: Send + Sync {
    /// Append one record in insertion order
    fn append<'a>(&'a self, record: &'a CheckRecord) -> StoreFuture<'a, ()>;

    /// Status of the newest record for `name`, `Unknown` when there is none
    fn latest_status<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Status>;

    /// Records matching `query`, ordered and capped as it asks
    fn query<'a>(&'a self, query: &'a ResolvedQuery) -> StoreFuture<'a, Vec<CheckRecord>>;

    /// Delete every record strictly older than `cutoff`, returning the count
    fn prune_older_than(&self, cutoff: Timestamp) -> StoreFuture<'_, usize>;

    /// Cheap reachability check
    fn ping(&self) -> StoreFuture<'_, ()>;
}

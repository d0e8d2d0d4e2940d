//! SQLite history backend

use crate::error::StorageError;
use crate::history::schema::init_schema;
use crate::history::{HistoryStore, Order, ResolvedQuery, StoreFuture};
use crate::records::{CheckRecord, Status, Timestamp};
use log::debug;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::path::Path;
use tokio_rusqlite::Connection;

const SELECT_COLUMNS: &str =
    "SELECT name, status, status_code, timestamp, scheduled, duration_ms, error_detail FROM logs";

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// History store persisted in a SQLite database
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    /// Open (or create) the database at `path`; ":memory:" opens an in-memory one
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str() == ":memory:" {
            return Self::in_memory().await;
        }

        let conn = Connection::open(&path)
            .await
            .map_err(|e| StorageError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Self::initialize(conn).await
    }

    /// Create a database that lives only as long as this value
    pub async fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, StorageError> {
        conn.call(|conn| Ok(init_schema(conn)?)).await?;
        Ok(Self { conn })
    }
}

/// Build the SELECT statement and its bound values for `query`
fn build_select(query: &ResolvedQuery) -> (String, Vec<Value>) {
    let mut sql = SELECT_COLUMNS.to_string();
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(ref name) = query.name {
        conditions.push("name = ?");
        binds.push(Value::Text(name.clone()));
    }
    if let Some(since) = query.since {
        conditions.push("timestamp >= ?");
        binds.push(Value::Integer(since));
    }
    if let Some(until) = query.until {
        conditions.push("timestamp <= ?");
        binds.push(Value::Integer(until));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    // rowid keeps records from the same second in insertion order
    match query.order {
        Order::Asc => sql.push_str(" ORDER BY timestamp ASC, rowid ASC"),
        Order::Desc => sql.push_str(" ORDER BY timestamp DESC, rowid DESC"),
    }

    if query.limit > 0 {
        sql.push_str(" LIMIT ?");
        binds.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
    }

    (sql, binds)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CheckRecord> {
    let duration_ms: i64 = row.get(5)?;

    Ok(CheckRecord {
        name: row.get(0)?,
        status: row.get(1)?,
        status_code: row.get(2)?,
        timestamp: row.get(3)?,
        scheduled: row.get(4)?,
        duration_ms: u64::try_from(duration_ms).unwrap_or(0),
        error_detail: row.get(6)?,
    })
}

impl HistoryStore for SqliteHistory {
    fn append<'a>(&'a self, record: &'a CheckRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let record = record.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO logs (name, status, status_code, timestamp, scheduled, duration_ms, error_detail)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            record.name,
                            record.status,
                            record.status_code,
                            record.timestamp,
                            record.scheduled,
                            i64::try_from(record.duration_ms).unwrap_or(i64::MAX),
                            record.error_detail,
                        ],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn latest_status<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Status> {
        Box::pin(async move {
            let name = name.to_string();
            let status = self
                .conn
                .call(move |conn| {
                    let status = conn
                        .query_row(
                            "SELECT status FROM logs WHERE name = ?1
                             ORDER BY timestamp DESC, rowid DESC LIMIT 1",
                            [&name],
                            |row| row.get::<_, Status>(0),
                        )
                        .optional()?;
                    Ok(status)
                })
                .await?;
            Ok(status.unwrap_or(Status::Unknown))
        })
    }

    fn query<'a>(&'a self, query: &'a ResolvedQuery) -> StoreFuture<'a, Vec<CheckRecord>> {
        Box::pin(async move {
            let (sql, binds) = build_select(query);
            debug!("History query: {} ({} binds)", sql, binds.len());

            let records = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&sql)?;
                    let records = stmt
                        .query_map(params_from_iter(binds), record_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(records)
                })
                .await?;
            Ok(records)
        })
    }

    fn prune_older_than(&self, cutoff: Timestamp) -> StoreFuture<'_, usize> {
        Box::pin(async move {
            let deleted = self
                .conn
                .call(move |conn| Ok(conn.execute("DELETE FROM logs WHERE timestamp < ?1", [cutoff])?))
                .await?;
            Ok(deleted)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.conn
                .call(|conn| {
                    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

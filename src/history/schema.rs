use rusqlite::Connection;

/// Create the log table and its indexes if they do not exist yet
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

const SCHEMA: &str = r#"
-- Append-only check log, ordered by insertion
CREATE TABLE IF NOT EXISTS logs (
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    status_code INTEGER NOT NULL DEFAULT 0,
    timestamp INTEGER NOT NULL,
    scheduled INTEGER NOT NULL DEFAULT 0,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    error_detail TEXT
);

-- Latest-status lookups and per-monitor range queries
CREATE INDEX IF NOT EXISTS idx_logs_name_timestamp ON logs(name, timestamp);

-- Retention pruning and the all-monitors default query
CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);
"#;

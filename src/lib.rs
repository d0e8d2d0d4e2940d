/// Error types for the uptime monitor
pub mod error;

/// Monitors, check records and sweep results
pub mod records;

/// Configuration management and monitor list providers
pub mod config;

/// Injectable wall clock
pub mod clock;

/// HTTP probe engine
pub mod probe;

/// Persistent check history
pub mod history;

/// Transition notifications and their sinks
pub mod alerts;

/// One sweep over every monitor
pub mod orchestrator;

/// Timer trigger for scheduled sweeps
pub mod scheduler;

/// Hourly status bars and HTML rendering
pub mod dashboard;

/// Dashboard and query API server
pub mod server;

// Re-export commonly used types
pub use error::{ConfigError, NotifyError, StorageError, SweepError};
pub use records::{CheckRecord, Monitor, Status, SweepResult, TriggerSource};

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors raised by the check history store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open history database: {0}")]
    ConnectionError(String),

    #[error("History query failed: {0}")]
    QueryError(String),
}

impl From<tokio_rusqlite::Error> for StorageError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        StorageError::QueryError(err.to_string())
    }
}

/// Errors that can occur when delivering a notification
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to send notification: {0}")]
    NotificationFailed(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// A probe was abandoned because its cancellation token fired
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Probe cancelled")]
pub struct ProbeCancelled;

/// Errors that abort a whole sweep
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Monitor list unavailable: {0}")]
    Config(#[from] ConfigError),

    #[error("Another sweep is already running")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_error_wraps_config_error() {
        let err: SweepError = ConfigError::ParseError("expected array".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Monitor list unavailable: Failed to parse config: expected array"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::QueryError("disk I/O error".to_string());
        assert_eq!(err.to_string(), "History query failed: disk I/O error");
    }
}

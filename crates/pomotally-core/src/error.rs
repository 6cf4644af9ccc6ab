//! Core error types for pomotally-core.
//!
//! Every concern gets its own thiserror enum; [`CoreError`] wraps them so
//! callers can propagate any failure with `?`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomotally-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persisted or imported history failed an integrity check
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Backend read/write failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Caller-supplied input was rejected
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Remote-invocation failures
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One of the three index-aligned history sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Pomodoros,
    Durations,
    Timezones,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::Pomodoros => "pomodoros",
            Field::Durations => "durations",
            Field::Timezones => "timezones",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Integrity errors raised while decoding, encoding or migrating history.
///
/// All of these are fatal to the operation that raised them; nothing is
/// written once one has been returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// A required field is absent from the payload
    #[error("Missing {field} data")]
    MissingData { field: Field },

    /// A field is present but has the wrong structure
    #[error("Invalid {field} data: {reason}")]
    InvalidShape { field: Field, reason: String },

    /// A decoded element is not an integer
    #[error("Invalid {field} data: element {index} is not an integer")]
    InvalidElement { field: Field, index: usize },

    /// Missing version or a migration that did not advance by exactly one
    #[error("Version integrity violated: {0}")]
    VersionIntegrity(String),
}

/// Persistence backend errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the SQLite database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored text could not be parsed back into a payload
    #[error("Stored payload is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the connection
    #[error("Database connection lock poisoned")]
    Poisoned,

    /// The data directory could not be determined or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors for caller-supplied input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Unrecognized page-placement target
    #[error("Invalid page host: {0}")]
    InvalidHost(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors at the remote-invocation boundary.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid service request: {0}")]
    UnknownService(String),

    #[error("Invalid service request: {service}.{method}")]
    UnknownMethod { service: String, method: String },

    #[error("Invalid arguments for {method}: {message}")]
    InvalidArguments { method: String, message: String },

    /// An error relayed back from the handling side
    #[error("{0}")]
    Remote(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_errors_name_the_field() {
        let err = HistoryError::MissingData {
            field: Field::Durations,
        };
        assert_eq!(err.to_string(), "Missing durations data");

        let err = HistoryError::InvalidElement {
            field: Field::Timezones,
            index: 3,
        };
        assert!(err.to_string().contains("timezones"));
        assert!(err.to_string().contains("element 3"));
    }

    #[test]
    fn core_error_wraps_history_error() {
        let err: CoreError = HistoryError::VersionIntegrity("Missing version".into()).into();
        assert!(matches!(
            err,
            CoreError::History(HistoryError::VersionIntegrity(_))
        ));
    }
}

//! Core error types for dchrono-core.
//!
//! This module defines the error hierarchy used by the lifecycle controller,
//! the alarm stores and the configuration layer, built on thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::alarm::AlarmId;

/// Core error type for dchrono-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed input to `create` or `update`
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation referenced an alarm id the store does not know
    #[error("Alarm not found: {0}")]
    NotFound(AlarmId),

    /// Operation is illegal for the alarm's current state
    #[error("Cannot {operation} alarm {id} while it is {state}")]
    InvalidState {
        id: AlarmId,
        operation: &'static str,
        state: &'static str,
    },

    /// Persistence failures
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True for the errors `on_wake` reports when a wake no longer matches
    /// the stored alarm (deleted, disabled, already ringing, re-armed).
    pub fn is_stale_wake(&self) -> bool {
        matches!(self, CoreError::NotFound(_) | CoreError::InvalidState { .. })
    }
}

/// Alarm store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded into an alarm
    #[error("Corrupt alarm record {id}: {message}")]
    Corrupt { id: String, message: String },

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Alarm name missing or whitespace only
    #[error("Alarm name must not be empty")]
    EmptyName,

    /// Time of day not in `HH:MM` form or out of range
    #[error("Malformed time '{0}': expected HH:MM (00:00-23:59)")]
    MalformedTime(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_wake_classification() {
        let id = AlarmId::new();
        assert!(CoreError::NotFound(id).is_stale_wake());
        assert!(CoreError::InvalidState {
            id,
            operation: "wake",
            state: "DISABLED",
        }
        .is_stale_wake());
        assert!(!CoreError::Store(StoreError::Locked).is_stale_wake());
        assert!(!CoreError::Validation(ValidationError::EmptyName).is_stale_wake());
    }

    #[test]
    fn invalid_state_message_names_operation() {
        let id = AlarmId::new();
        let err = CoreError::InvalidState {
            id,
            operation: "snooze",
            state: "SCHEDULED",
        };
        let msg = err.to_string();
        assert!(msg.contains("snooze"));
        assert!(msg.contains("SCHEDULED"));
    }
}

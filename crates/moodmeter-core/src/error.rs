//! Core error types for moodmeter-core.
//!
//! The taxonomy callers act on is small: `Unauthorized`, `NotFound` and
//! `Conflict` are surfaced to the user as-is, while storage and upstream
//! failures are transient and recovered by falling back to last-known-good
//! data until the next poll.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for moodmeter-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or mismatched bearer credential on a protected mutation
    #[error("Unauthorized: a valid bearer token is required")]
    Unauthorized,

    /// Delete/complete referencing an unknown id
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Mutation rejected before any write (e.g. deleting an in-use tag)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage backend failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Upstream metering failures
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether the failure is a transient IO failure that the caller should
    /// recover from locally and retry on the next natural poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Storage(_) | CoreError::Upstream(_))
    }
}

/// Document store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read or write a document file
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored document could not be decoded
    #[error("Corrupt document '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Could not determine the data directory
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
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Level or difficulty outside 1..=3
    #[error("Invalid level {0}: expected 1, 2 or 3")]
    InvalidLevel(u8),

    /// Empty value where one is required
    #[error("Empty value for '{0}'")]
    Empty(&'static str),

    /// The same id appears twice in a replaced list
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// A task references a tag that is not in the catalog
    #[error("Unknown tag '{tag}' on task {task_id}")]
    UnknownTag { task_id: String, tag: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CoreError::Upstream("timeout".into()).is_transient());
        assert!(CoreError::Storage(StorageError::Locked).is_transient());
        assert!(!CoreError::Unauthorized.is_transient());
        assert!(!CoreError::not_found("Task", "t1").is_transient());
        assert!(!CoreError::Conflict("tag in use".into()).is_transient());
    }

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = CoreError::not_found("Flow task", "abc");
        assert_eq!(err.to_string(), "Flow task not found: abc");
    }
}

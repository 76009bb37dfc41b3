//! Core error types for blackreaper-core.
//!
//! This module defines the error hierarchy using thiserror. The remote
//! store taxonomy distinguishes transient failures (retry with backoff)
//! from permanent ones (dead-letter, do not retry).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for blackreaper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Local durable storage errors
    #[error("Local storage error: {0}")]
    LocalStore(#[from] LocalStoreError),

    /// Reward ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors from the remote data store collaborator.
///
/// Callers classify these with [`StoreError::is_transient`]: transient
/// failures keep a queued operation alive for retry, permanent ones
/// dead-letter it.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Backend unreachable (no connectivity, DNS failure, refused).
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    /// Request timed out in flight.
    #[error("Store request timed out for '{path}'")]
    Timeout { path: String },

    /// Write rejected by the backend's security rules.
    #[error("Permission denied for '{path}'")]
    PermissionDenied { path: String },

    /// Path is malformed (empty segment, illegal characters).
    #[error("Invalid path: '{0}'")]
    InvalidPath(String),

    /// Payload could not be serialized for the wire.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Optimistic transaction aborted after exhausting its retry budget.
    #[error("Transaction on '{path}' did not commit")]
    Conflict { path: String },
}

impl StoreError {
    /// Whether a failed operation should stay queued for a later retry.
    ///
    /// Permission and validity failures will never succeed no matter how
    /// often they are replayed; everything network-shaped will.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unreachable(_) | StoreError::Timeout { .. } | StoreError::Conflict { .. }
        )
    }
}

/// Local durable storage errors.
#[derive(Error, Debug)]
pub enum LocalStoreError {
    /// Failed to open the backing database
    #[error("Failed to open local store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Local store is locked")]
    Locked,

    /// Stored value could not be decoded
    #[error("Corrupt entry for key '{key}': {message}")]
    CorruptEntry { key: String, message: String },
}

impl From<rusqlite::Error> for LocalStoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    LocalStoreError::Locked
                } else {
                    LocalStoreError::QueryFailed(err.to_string())
                }
            }
            _ => LocalStoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Reward ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The balance transaction was aborted by the store
    #[error("Balance transaction on '{path}' was not committed")]
    NotCommitted { path: String },

    /// Transaction log entry could not be decoded
    #[error("Corrupt transaction record: {0}")]
    CorruptRecord(#[from] serde_json::Error),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

//! Error types for BucketKV
//!
//! Provides a unified error type for all operations, plus a coarse
//! [`ErrorKind`] tag callers can match on without caring about detail.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for BucketKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// The database file could not be opened, created or parsed.
    #[error("Database '{database}' is unavailable: {reason}")]
    StorageUnavailable { database: String, reason: String },

    /// A read or delete named a bucket that was never created.
    #[error("Bucket does not exist")]
    BucketNotFound { bucket: String },

    /// A record inside a database file failed validation.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Timed out after {waited_ms} ms waiting for the lock on '{database}'")]
    Timeout { database: String, waited_ms: u64 },

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`KvError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StorageUnavailable,
    BucketNotFound,
    TransactionAborted,
    InvalidInput,
    Timeout,
    Transport,
}

impl KvError {
    /// Tag this error with its kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvError::StorageUnavailable { .. } | KvError::Corruption(_) => {
                ErrorKind::StorageUnavailable
            }
            KvError::BucketNotFound { .. } => ErrorKind::BucketNotFound,
            KvError::TransactionAborted(_) | KvError::Serialization(_) => {
                ErrorKind::TransactionAborted
            }
            KvError::Timeout { .. } => ErrorKind::Timeout,
            KvError::InvalidInput(_) | KvError::Config(_) => ErrorKind::InvalidInput,
            KvError::Io(_) | KvError::Network(_) | KvError::Protocol(_) => ErrorKind::Transport,
        }
    }

    /// Wrap any error as a storage failure for `database`
    pub(crate) fn unavailable(database: &str, reason: impl std::fmt::Display) -> Self {
        KvError::StorageUnavailable {
            database: database.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Render for a caller-facing reply: `Error: '<detail>'`
    pub fn to_reply_message(&self) -> String {
        format!("Error: '{}'", self)
    }
}

impl From<bincode::Error> for KvError {
    fn from(e: bincode::Error) -> Self {
        KvError::Serialization(e.to_string())
    }
}

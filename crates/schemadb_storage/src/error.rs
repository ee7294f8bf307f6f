//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another engine holds the lock on the storage root.
    #[error("storage root locked: {path}")]
    Locked {
        /// Path of the lock file.
        path: String,
    },

    /// The database name cannot be mapped to a storage location.
    #[error("invalid database name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A write was refused by an in-memory backend configured to fail.
    #[error("write rejected by backend: {0}")]
    WriteRejected(String),
}

impl StorageError {
    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason,
        }
    }
}

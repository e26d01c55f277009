//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The durable copy does not exist.
    #[error("store not found: {path}")]
    Missing {
        /// Location that was expected to hold the store.
        path: PathBuf,
    },

    /// Another writer holds the exclusive lock.
    #[error("store locked by another writer: {path}")]
    Locked {
        /// Lock file that could not be acquired.
        path: PathBuf,
    },
}

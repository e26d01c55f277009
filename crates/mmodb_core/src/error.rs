//! Error types for mmodb core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in mmodb core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Flat store error.
    #[error("storage error: {0}")]
    Storage(#[from] mmodb_storage::StorageError),

    /// Record codec error.
    #[error("codec error: {0}")]
    Codec(#[from] mmodb_codec::CodecError),

    /// Relational store error. The enclosing transaction has been rolled back.
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A resource required at init is missing or unreadable.
    #[error("required resource unavailable: {resource}")]
    MissingResource {
        /// The file or table that could not be used.
        resource: String,
    },

    /// No record with this id exists.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind.
        kind: &'static str,
        /// The id that was looked up.
        id: u32,
    },

    /// A name resolved to more than one record.
    #[error("name {name:?} is ambiguous: {matches} records match")]
    Ambiguous {
        /// The name that was looked up.
        name: String,
        /// How many records matched.
        matches: usize,
    },

    /// A create collided with an existing record.
    #[error("{kind} {id} already exists")]
    Conflict {
        /// Entity kind.
        kind: &'static str,
        /// The colliding id.
        id: u32,
    },

    /// A partial update referenced something that does not exist.
    #[error("invalid update: {message}")]
    InvalidUpdate {
        /// Description of the problem.
        message: String,
    },

    /// The backend is not initialized, or was destroyed.
    #[error("backend is closed")]
    Closed,

    /// `init` was called on a backend that is already open.
    #[error("backend is already open")]
    AlreadyOpen,
}

impl CoreError {
    /// Creates a missing resource error.
    pub fn missing_resource(resource: impl Into<String>) -> Self {
        Self::MissingResource {
            resource: resource.into(),
        }
    }

    /// Creates an ambiguous name error.
    pub fn ambiguous(name: impl Into<String>, matches: usize) -> Self {
        Self::Ambiguous {
            name: name.into(),
            matches,
        }
    }

    /// Creates an invalid update error.
    pub fn invalid_update(message: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            message: message.into(),
        }
    }

    /// Whether this is a not-found outcome rather than a failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

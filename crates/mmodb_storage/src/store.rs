//! Flat store trait definition.

use crate::error::StorageResult;
use std::io::{BufRead, Write};

/// A whole-file text store with atomic replacement.
///
/// Flat stores hold one durable copy that is read line by line and replaced
/// wholesale. They do not interpret the text they hold.
///
/// # Invariants
///
/// - `open_reader` fails with [`crate::StorageError::Missing`] when no durable
///   copy exists; it never creates one
/// - Bytes written to a [`DumpWriter`] become visible to readers only after
///   [`DumpWriter::commit`] succeeds
/// - A writer dropped without `commit` leaves the previous copy untouched
///
/// # Implementors
///
/// - [`super::FileStore`] - For persistent storage
/// - [`super::MemoryStore`] - For testing
pub trait FlatStore: Send {
    /// Opens the current durable copy for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy is missing or cannot be opened.
    fn open_reader(&self) -> StorageResult<Box<dyn BufRead + '_>>;

    /// Starts a full replacement of the durable copy.
    ///
    /// The returned handle holds exclusive write access until it is committed
    /// or dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if exclusive access cannot be obtained.
    fn begin_dump(&mut self) -> StorageResult<Box<dyn DumpWriter + '_>>;

    /// Human-readable location, for log messages.
    fn location(&self) -> String;
}

/// Scoped exclusive-write handle returned by [`FlatStore::begin_dump`].
pub trait DumpWriter: Write {
    /// Publishes everything written so far as the new durable copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be made durable. The previous copy
    /// is left in place in that case.
    fn commit(self: Box<Self>) -> StorageResult<()>;
}

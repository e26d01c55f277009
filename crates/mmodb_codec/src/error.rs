//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding a flat-file line.
///
/// Every variant describes a malformed line. Loaders skip the line and
/// continue; none of these are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The declared version and observed column count match no known layout.
    #[error("unsupported layout: version {version} with {columns} columns")]
    UnsupportedLayout {
        /// Format version in effect for the line.
        version: u32,
        /// Number of tab-separated columns observed.
        columns: usize,
    },

    /// The id column reads as the reserved id 0.
    #[error("account id is 0 or not a number")]
    ReservedId,
}

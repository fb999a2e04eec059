//! Error types for HGO chunk decoding and encoding.

use thiserror::Error;

use crate::chunk::ChunkTag;

/// Errors that can occur when working with HGO chunks.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error (end of data, deferred offsets, ...).
    #[error("{0}")]
    Common(#[from] gcasset_common::Error),

    /// A chunk did not carry the tag the caller expected.
    #[error("malformed chunk at offset {offset:#x}: expected tag {expected}, got {actual}")]
    MalformedChunk {
        offset: usize,
        expected: ChunkTag,
        actual: ChunkTag,
    },

    /// A mesh used a face-encoding code other than 5 (list) or 6 (strips).
    #[error("unsupported primitive type {code} at offset {offset:#x}")]
    UnsupportedPrimitiveType { offset: usize, code: u32 },

    /// A strip set's last strip ran past the declared word budget.
    #[error(
        "triangle strips at offset {offset:#x} consumed {consumed} words but only {declared} were declared"
    )]
    StripBudgetExceeded {
        offset: usize,
        declared: u32,
        consumed: u32,
    },

    /// A value is too large for the field that stores it.
    #[error("{what} count {count} does not fit in its on-disk field")]
    CountOverflow { what: &'static str, count: usize },
}

/// Result type for HGO operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert an in-memory length to the `u32` count stored on disk.
pub(crate) fn count_u32(what: &'static str, count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::CountOverflow { what, count })
}

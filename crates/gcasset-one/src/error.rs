//! Error types for ONE archives.

use thiserror::Error;

/// Errors that can occur when working with ONE archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gcasset_common::Error),

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Compression error.
    #[error("compression error: {0}")]
    Compression(String),

    /// An entry name does not fit in the 0x20-byte directory field.
    #[error("entry name '{name}' is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },

    /// An entry name would place an extracted file outside the target directory.
    #[error("entry name '{0}' is not a plain file name")]
    UnsafeName(String),

    /// A value is too large for the field that stores it.
    #[error("{what} {count} does not fit in its on-disk field")]
    CountOverflow { what: &'static str, count: usize },
}

/// Result type for ONE operations.
pub type Result<T> = std::result::Result<T, Error>;

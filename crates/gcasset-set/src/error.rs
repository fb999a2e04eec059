//! Error types for SET files.

use thiserror::Error;

/// Errors that can occur when working with SET files.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gcasset_common::Error),

    /// An object's parameter block would be read from outside the parameter region.
    #[error(
        "object {object}: parameter block of {length} bytes at offset {cursor:#x} runs outside the parameter region ending at {region_end:#x}"
    )]
    InvalidParameterLayout {
        object: usize,
        cursor: usize,
        length: i64,
        region_end: usize,
    },

    /// A value is too large for the field that stores it.
    #[error("{what} {count} does not fit in its on-disk field")]
    CountOverflow { what: &'static str, count: usize },
}

/// Result type for SET operations.
pub type Result<T> = std::result::Result<T, Error>;

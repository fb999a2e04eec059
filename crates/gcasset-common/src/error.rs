//! Error types for gcasset-common.

use thiserror::Error;

/// Common error type for gcasset operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error(
        "unexpected end of data at offset {offset:#x}: needed {needed} bytes but only {available} available"
    )]
    UnexpectedEndOfData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A seek target lies past the end of the buffer.
    #[error("cannot seek to offset {position:#x}: buffer is only {len:#x} bytes long")]
    SeekOutOfRange { position: usize, len: usize },

    /// Invalid magic bytes encountered.
    #[error("invalid magic at offset {offset:#x}: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        offset: usize,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// A deferred offset was reserved but never resolved before the buffer was finished.
    #[error("deferred offset '{name}' was reserved but never resolved")]
    UnresolvedOffset { name: String },

    /// A deferred offset was resolved without ever being reserved.
    #[error("deferred offset '{name}' was resolved but never reserved")]
    UnreservedOffset { name: String },

    /// A resolved offset does not fit in its 4-byte placeholder.
    #[error("deferred offset '{name}' resolved to {value:#x}, which does not fit in 32 bits")]
    OffsetOutOfRange { name: String, value: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Missing null terminator in string.
    #[error("string at offset {offset:#x} is missing its null terminator")]
    MissingNullTerminator { offset: usize },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

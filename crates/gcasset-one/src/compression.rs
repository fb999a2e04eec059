//! Payload compression seam.

use crate::Result;

/// A codec applied to individual archive payloads.
///
/// The archive layer only moves bytes; it calls into a `Compressor` after
/// reading a payload and before writing one.
pub trait Compressor {
    /// Compress a whole payload.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress a whole payload.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

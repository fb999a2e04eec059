//! Common utilities for gcasset.
//!
//! This crate provides the byte-level foundation shared by every format crate:
//!
//! - [`BinaryReader`] - Bounds-checked, zero-copy reading from byte slices
//! - [`BinaryWriter`] - Appending writer with named deferred offsets
//! - [`Vector2`], [`Vector3`], [`Matrix4`] - Plain value types stored in the formats
//!
//! All formats handled here are little-endian.

mod error;
mod math;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use math::{Matrix4, Vector2, Vector3};
pub use reader::{padding_for, BinaryReader};
pub use writer::BinaryWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Re-export zerocopy's little-endian field types for fixed on-disk records
pub use zerocopy::byteorder::little_endian;

//! Binary writer with named deferred offsets.
//!
//! [`BinaryWriter`] appends little-endian data to a growable buffer. Formats
//! that store forward references (chunk sizes, payload offsets, word counts)
//! write a 4-byte placeholder with [`BinaryWriter::reserve_offset`] and supply
//! the real value later with [`BinaryWriter::resolve_offset`] or
//! [`BinaryWriter::resolve_offset_value`]. All placeholders are patched in a
//! single pass by [`BinaryWriter::finish`].

use std::hash::BuildHasherDefault;

use byteorder::{ByteOrder, LittleEndian};
use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use zerocopy::{Immutable, IntoBytes};

use crate::math::{Matrix4, Vector2, Vector3};
use crate::reader::padding_for;
use crate::{Error, Result};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Placeholder sites registered under one name, plus the value they receive.
#[derive(Debug, Default)]
struct DeferredOffset {
    sites: Vec<usize>,
    value: Option<u32>,
}

/// A binary writer that appends to an owned buffer.
///
/// # Example
///
/// ```
/// use gcasset_common::BinaryWriter;
///
/// let mut writer = BinaryWriter::new();
/// writer.reserve_offset("data");
/// writer.write_u32(0xAABBCCDD);
/// writer.resolve_offset("data").unwrap();
/// writer.write_u8(7);
///
/// let bytes = writer.finish().unwrap();
/// assert_eq!(&bytes[..4], &8u32.to_le_bytes());
/// ```
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
    offsets: FxHashMap<String, DeferredOffset>,
    // Reservation order, so `finish` reports the first unresolved name deterministically.
    order: Vec<String>,
    labels: usize,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Current write position (always the end of the buffer).
    #[inline]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes written so far, with placeholders still zeroed.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Generate a name that has not been handed out by this writer before.
    ///
    /// Useful for offsets that belong to a repeated structure (one size field
    /// per chunk or per mesh) where the caller has no natural unique key.
    pub fn unique_name(&mut self, prefix: &str) -> String {
        self.labels += 1;
        format!("{}#{}", prefix, self.labels)
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Append `count` zero bytes.
    #[inline]
    pub fn write_zeros(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_vector2(&mut self, value: Vector2) {
        self.write_f32(value.x);
        self.write_f32(value.y);
    }

    pub fn write_vector3(&mut self, value: Vector3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    /// Write a 4x4 matrix row by row.
    pub fn write_matrix4(&mut self, value: &Matrix4) {
        for row in &value.rows {
            for &cell in row {
                self.write_f32(cell);
            }
        }
    }

    /// Write a 4-byte tag with no terminator.
    #[inline]
    pub fn write_tag(&mut self, tag: [u8; 4]) {
        self.write_bytes(&tag);
    }

    /// Write `value` into a field of exactly `width` bytes.
    ///
    /// Longer strings are truncated, shorter ones padded with zero bytes.
    pub fn write_padded_string(&mut self, value: &str, width: usize) {
        let bytes = value.as_bytes();
        let used = bytes.len().min(width);
        self.write_bytes(&bytes[..used]);
        self.write_zeros(width - used);
    }

    /// Write a fixed-layout struct using zerocopy.
    #[inline]
    pub fn write_struct<T: IntoBytes + Immutable>(&mut self, value: &T) {
        self.write_bytes(value.as_bytes());
    }

    /// Pad with zero bytes up to the next multiple of `alignment`, measured
    /// from the start of the buffer.
    pub fn align(&mut self, alignment: usize) {
        let padding = padding_for(self.position(), alignment);
        self.write_zeros(padding);
    }

    /// Write a 4-byte placeholder and register it under `name`.
    ///
    /// Several placeholders may share one name; all of them receive the same
    /// value when the name is resolved.
    pub fn reserve_offset(&mut self, name: impl Into<String>) {
        let name = name.into();
        let site = self.position();
        self.write_zeros(4);

        match self.offsets.get_mut(&name) {
            Some(entry) => entry.sites.push(site),
            None => {
                self.order.push(name.clone());
                self.offsets.insert(
                    name,
                    DeferredOffset {
                        sites: vec![site],
                        value: None,
                    },
                );
            }
        }
    }

    /// Resolve `name` to the current write position.
    pub fn resolve_offset(&mut self, name: &str) -> Result<()> {
        let position = self.position();
        let value = u32::try_from(position).map_err(|_| Error::OffsetOutOfRange {
            name: name.to_string(),
            value: position,
        })?;
        self.resolve_offset_value(name, value)
    }

    /// Resolve `name` to an explicit value, such as a relative size or a count.
    pub fn resolve_offset_value(&mut self, name: &str, value: u32) -> Result<()> {
        let entry = self
            .offsets
            .get_mut(name)
            .ok_or_else(|| Error::UnreservedOffset {
                name: name.to_string(),
            })?;
        entry.value = Some(value);
        Ok(())
    }

    /// Patch every placeholder and return the finished buffer.
    ///
    /// Fails if any reserved name was never resolved.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        for name in &self.order {
            let entry = &self.offsets[name];
            let value = entry.value.ok_or_else(|| Error::UnresolvedOffset { name: name.clone() })?;
            for &site in &entry.sites {
                LittleEndian::write_u32(&mut self.buffer[site..site + 4], value);
            }
        }
        Ok(self.buffer)
    }
}

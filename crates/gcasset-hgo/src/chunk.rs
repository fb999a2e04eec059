//! Chunk framing.
//!
//! Every HGO section is a chunk:
//!
//! ```text
//! +--------+--------+------------------+---------+
//! | tag    | size   | body             | padding |
//! | 4 B    | u32 LE | variable         | 0..3 B  |
//! +--------+--------+------------------+---------+
//!                   |<------------- size -------->|
//! ```
//!
//! `size` excludes the tag and size fields and includes the zero padding that
//! brings the end of the chunk to a multiple of 4 (relative to the start of
//! the stream). Tags are stored byte-reversed: the geometry chunk named
//! `GST0` appears on disk as `0TSG`.

use std::fmt;

use gcasset_common::{BinaryReader, BinaryWriter};

use crate::error::{count_u32, Error, Result};

/// Chunks end on a multiple of this many bytes.
pub const CHUNK_ALIGNMENT: usize = 4;

/// Size of the tag and size fields that precede a chunk body.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// A chunk tag, stored as the bytes that appear on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkTag([u8; 4]);

impl ChunkTag {
    /// Transform instance table (`TSNI` on disk).
    pub const INSTANCES: Self = Self::from_name(*b"INST");
    /// Geometry set (`0TSG` on disk).
    pub const GEOMETRY: Self = Self::from_name(*b"GST0");

    /// Build a tag from its logical, human-readable name.
    #[inline]
    pub const fn from_name(name: [u8; 4]) -> Self {
        Self([name[3], name[2], name[1], name[0]])
    }

    /// Build a tag from the four bytes found in the file.
    #[inline]
    pub const fn from_disk(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The bytes written to disk.
    #[inline]
    pub const fn disk_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// The logical name (disk bytes reversed).
    #[inline]
    pub const fn name(&self) -> [u8; 4] {
        let b = self.0;
        [b[3], b[2], b[1], b[0]]
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.name() {
            if byte.is_ascii_graphic() {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{:02x}", byte)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkTag({})", self)
    }
}

/// The framing fields of a chunk, as found while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk tag.
    pub tag: ChunkTag,
    /// Declared body size in bytes.
    pub size: u32,
    /// Offset of the tag field.
    pub offset: usize,
    /// Offset of the first body byte.
    pub body_start: usize,
}

impl ChunkHeader {
    /// Offset at which the body (including padding) should end.
    #[inline]
    pub fn body_end(&self) -> usize {
        self.body_start + self.size as usize
    }

    /// Read the tag and size fields at the reader's position.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let offset = reader.position();
        let tag = ChunkTag::from_disk(reader.read_tag()?);
        let size = reader.read_u32()?;
        Ok(Self {
            tag,
            size,
            offset,
            body_start: reader.position(),
        })
    }

    /// Read the tag and size fields without consuming them.
    pub fn peek(reader: &BinaryReader<'_>) -> Result<Self> {
        let mut lookahead = reader.clone();
        Self::read(&mut lookahead)
    }
}

/// Read a chunk whose tag must be `expected`, decoding its body with `body`.
///
/// After the body reader returns, the reader skips forward to the next
/// multiple of [`CHUNK_ALIGNMENT`] counted from the start of the stream, not
/// from the start of the chunk. The declared size is only cross-checked: a
/// disagreement is logged, never fatal.
pub fn read_chunk<'a, T, F>(reader: &mut BinaryReader<'a>, expected: ChunkTag, body: F) -> Result<T>
where
    F: FnOnce(&mut BinaryReader<'a>, &ChunkHeader) -> Result<T>,
{
    let header = ChunkHeader::read(reader)?;
    if header.tag != expected {
        return Err(Error::MalformedChunk {
            offset: header.offset,
            expected,
            actual: header.tag,
        });
    }

    tracing::debug!(
        tag = %header.tag,
        offset = header.offset,
        size = header.size,
        "reading chunk"
    );

    let value = body(reader, &header)?;
    reader.align(CHUNK_ALIGNMENT)?;

    if reader.position() != header.body_end() {
        tracing::warn!(
            tag = %header.tag,
            declared_end = header.body_end(),
            actual_end = reader.position(),
            "chunk size disagrees with decoded body"
        );
    }

    Ok(value)
}

/// Write a chunk: tag, deferred size, body, zero padding to [`CHUNK_ALIGNMENT`].
///
/// The size field is resolved to the number of bytes between the end of the
/// size field and the end of the padding.
pub fn write_chunk<F>(writer: &mut BinaryWriter, tag: ChunkTag, body: F) -> Result<()>
where
    F: FnOnce(&mut BinaryWriter) -> Result<()>,
{
    let start = writer.position();
    writer.write_tag(tag.disk_bytes());

    let size_name = writer.unique_name(&format!("chunk:{}", tag));
    writer.reserve_offset(size_name.clone());
    let body_start = writer.position();

    body(writer)?;
    writer.align(CHUNK_ALIGNMENT);

    let size = count_u32("chunk byte", writer.position() - body_start)?;
    writer.resolve_offset_value(&size_name, size)?;

    tracing::debug!(tag = %tag, offset = start, size, "wrote chunk");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_reversed_on_disk() {
        assert_eq!(&ChunkTag::GEOMETRY.disk_bytes(), b"0TSG");
        assert_eq!(&ChunkTag::INSTANCES.disk_bytes(), b"TSNI");
        assert_eq!(&ChunkTag::from_disk(*b"0TSG").name(), b"GST0");
        assert_eq!(ChunkTag::GEOMETRY.to_string(), "GST0");
    }

    #[test]
    fn test_size_excludes_header_and_includes_padding() {
        let mut writer = BinaryWriter::new();
        write_chunk(&mut writer, ChunkTag::GEOMETRY, |w| {
            w.write_bytes(&[1, 2, 3, 4, 5]);
            Ok(())
        })
        .unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(&bytes[..4], b"0TSG");
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes.len() % CHUNK_ALIGNMENT, 0);
        let size = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        assert_eq!(size, bytes.len() - CHUNK_HEADER_SIZE);
        assert!(bytes[13..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_chunk_round_trips_body() {
        let mut writer = BinaryWriter::new();
        write_chunk(&mut writer, ChunkTag::INSTANCES, |w| {
            w.write_u32(0xDEADBEEF);
            w.write_u16(7);
            Ok(())
        })
        .unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = BinaryReader::new(&bytes);
        let (a, b) = read_chunk(&mut reader, ChunkTag::INSTANCES, |r, header| {
            assert_eq!(header.size, 8);
            Ok((r.read_u32()?, r.read_u16()?))
        })
        .unwrap();
        assert_eq!((a, b), (0xDEADBEEF, 7));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_tag_mismatch_is_malformed() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"TSNI");
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let mut reader = BinaryReader::new(&bytes);
        let result = read_chunk(&mut reader, ChunkTag::GEOMETRY, |_, _| Ok(()));
        match result {
            Err(Error::MalformedChunk {
                offset,
                expected,
                actual,
            }) => {
                assert_eq!(offset, 0);
                assert_eq!(expected, ChunkTag::GEOMETRY);
                assert_eq!(actual, ChunkTag::INSTANCES);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_padding_skip_is_relative_to_stream_start() {
        // A 2-byte prefix puts the chunk at offset 2. The body reader consumes
        // one byte, ending at offset 11; the skip goes to 12 (absolute), not to
        // the chunk-relative boundary at 14.
        let mut bytes = vec![0xAA, 0xBB];
        bytes.extend_from_slice(b"TSNI");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[9, 0, 0, 0]);

        let mut reader = BinaryReader::new(&bytes);
        reader.skip(2).unwrap();
        let value = read_chunk(&mut reader, ChunkTag::INSTANCES, |r, _| Ok(r.read_u8()?)).unwrap();
        assert_eq!(value, 9);
        assert_eq!(reader.position(), 12);
    }

    #[test]
    fn test_peek_header_does_not_advance() {
        let mut bytes = b"0TSG".to_vec();
        bytes.extend_from_slice(&12u32.to_le_bytes());
        let reader = BinaryReader::new(&bytes);

        let header = ChunkHeader::peek(&reader).unwrap();
        assert_eq!(header.tag, ChunkTag::GEOMETRY);
        assert_eq!(header.body_end(), 20);
        assert_eq!(reader.position(), 0);
    }
}

//! SET document decoding and encoding.

use std::fs;
use std::path::Path;

use gcasset_common::little_endian::{I32, U32};
use gcasset_common::{BinaryReader, BinaryWriter, Vector3};

use crate::catalog::{self, ObjectKind};
use crate::record::{vector_from_disk, vector_to_disk, SetRecord, SET_HEADER_SIZE, SET_RECORD_SIZE};
use crate::{Error, Result};

/// Magic bytes at the start of every SET file (no terminator).
pub const SET_MAGIC: &[u8; 4] = b"sky2";

/// A placed object.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetObject {
    pub position: Vector3,
    /// Euler angles, in degrees.
    pub rotation: Vector3,
    /// Four bytes of unknown meaning, preserved as-is.
    pub tag_bytes: [u8; 4],
    /// Four more bytes of unknown meaning, preserved as-is.
    pub opaque: [u8; 4],
    pub object_type: u8,
    pub object_list: u8,
    pub link_id: u8,
    pub render_distance: u8,
    /// Word following the parameter length; meaning unknown.
    pub reserved: u32,
    /// The object's parameter block.
    pub misc_data: Vec<i32>,
}

impl SetObject {
    /// The catalogued kind of this object, if known.
    pub fn kind(&self) -> Option<&'static ObjectKind> {
        catalog::lookup(self.object_type, self.object_list)
    }

    fn from_record(record: &SetRecord, misc_data: Vec<i32>) -> Self {
        Self {
            position: vector_from_disk(record.position),
            rotation: vector_from_disk(record.rotation),
            tag_bytes: record.tag_bytes,
            opaque: record.opaque,
            object_type: record.object_type,
            object_list: record.object_list,
            link_id: record.link_id,
            render_distance: record.render_distance,
            reserved: record.reserved.get(),
            misc_data,
        }
    }

    fn to_record(&self) -> Result<SetRecord> {
        let bytes = self.misc_data.len() * 4;
        let param_length = i32::try_from(bytes).map_err(|_| Error::CountOverflow {
            what: "parameter byte length",
            count: bytes,
        })?;

        Ok(SetRecord {
            position: vector_to_disk(self.position),
            rotation: vector_to_disk(self.rotation),
            tag_bytes: self.tag_bytes,
            opaque: self.opaque,
            object_type: self.object_type,
            object_list: self.object_list,
            link_id: self.link_id,
            render_distance: self.render_distance,
            param_length: I32::new(param_length),
            reserved: U32::new(self.reserved),
        })
    }
}

/// Read positions for the two interleaved regions of a SET file.
///
/// Records are read sequentially from `fixed`; each record's parameter block
/// is read from `param`, which only ever moves forward by what was consumed.
#[derive(Debug, Clone, Copy)]
struct Cursors {
    fixed: usize,
    param: usize,
}

/// An object placement table.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetDocument {
    pub objects: Vec<SetObject>,
}

impl SetDocument {
    /// Create a document from its objects.
    pub fn new(objects: Vec<SetObject>) -> Self {
        Self { objects }
    }

    /// Read a SET file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    /// Write to a SET file on disk.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Decode a SET file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);

        reader.expect_magic(SET_MAGIC)?;
        let object_count = reader.read_u32()? as usize;
        let param_total = reader.read_u32()? as usize;

        let region_start =
            SET_HEADER_SIZE.saturating_add(object_count.saturating_mul(SET_RECORD_SIZE));
        let region_end = region_start.saturating_add(param_total);

        tracing::debug!(object_count, param_total, region_start, "reading SET");

        let mut cursors = Cursors {
            fixed: reader.position(),
            param: region_start,
        };
        let mut objects = Vec::with_capacity(object_count.min(0x10000));

        for index in 0..object_count {
            reader.seek(cursors.fixed)?;
            let record: SetRecord = reader.read_struct()?;
            cursors.fixed = reader.position();

            let length = record.param_length.get();
            let fits = usize::try_from(length)
                .ok()
                .and_then(|len| cursors.param.checked_add(len))
                .is_some_and(|end| end <= region_end);
            if !fits {
                return Err(Error::InvalidParameterLayout {
                    object: index,
                    cursor: cursors.param,
                    length: i64::from(length),
                    region_end,
                });
            }
            if length % 4 != 0 {
                tracing::warn!(
                    object = index,
                    length,
                    "parameter length is not a multiple of 4; trailing bytes ignored"
                );
            }

            reader.seek(cursors.param)?;
            let count = (length / 4) as usize;
            let mut misc_data = Vec::with_capacity(count);
            for _ in 0..count {
                misc_data.push(reader.read_i32()?);
            }
            cursors.param = reader.position();

            tracing::trace!(
                object = index,
                object_type = record.object_type,
                object_list = record.object_list,
                params = count,
                "read object"
            );
            objects.push(SetObject::from_record(&record, misc_data));
        }

        if cursors.param != region_end {
            tracing::warn!(
                consumed = cursors.param - region_start,
                declared = param_total,
                "parameter region length disagrees with the header"
            );
        }

        Ok(Self { objects })
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let param_words: usize = self.objects.iter().map(|o| o.misc_data.len()).sum();
        let mut writer =
            BinaryWriter::with_capacity(SET_HEADER_SIZE + self.objects.len() * SET_RECORD_SIZE + param_words * 4);

        writer.write_tag(*SET_MAGIC);
        let count = u32::try_from(self.objects.len()).map_err(|_| Error::CountOverflow {
            what: "object count",
            count: self.objects.len(),
        })?;
        writer.write_u32(count);
        writer.reserve_offset("param total");

        for object in &self.objects {
            writer.write_struct(&object.to_record()?);
        }

        let region_start = writer.position();
        for object in &self.objects {
            for &value in &object.misc_data {
                writer.write_i32(value);
            }
        }

        let total = writer.position() - region_start;
        let total = u32::try_from(total).map_err(|_| Error::CountOverflow {
            what: "parameter region length",
            count: total,
        })?;
        writer.resolve_offset_value("param total", total)?;

        Ok(writer.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(object_type: u8, misc_data: Vec<i32>) -> SetObject {
        SetObject {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::new(0.0, 90.0, 0.0),
            tag_bytes: [0, 0, 0, 0x40],
            opaque: [0xFF; 4],
            object_type,
            object_list: 0,
            link_id: 1,
            render_distance: 0x64,
            reserved: 0,
            misc_data,
        }
    }

    /// Build a raw SET file by hand, independent of the encoder.
    fn raw_set(records: &[(i32, u8)], params: &[i32]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(SET_MAGIC);
        data.extend_from_slice(&(records.len() as u32).to_le_bytes());
        data.extend_from_slice(&((params.len() * 4) as u32).to_le_bytes());
        for &(length, object_type) in records {
            data.extend_from_slice(&[0u8; 24]);
            data.extend_from_slice(&[0u8; 8]);
            data.extend_from_slice(&[object_type, 0, 0, 0]);
            data.extend_from_slice(&length.to_le_bytes());
            data.extend_from_slice(&[0u8; 4]);
        }
        for value in params {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parameter_cursor_runs_independently() {
        let data = raw_set(&[(8, 1), (4, 2)], &[10, 20, 30]);
        let doc = SetDocument::parse(&data).unwrap();

        assert_eq!(doc.objects.len(), 2);
        assert_eq!(doc.objects[0].misc_data, vec![10, 20]);
        assert_eq!(doc.objects[1].misc_data, vec![30]);
        assert_eq!(doc.objects[1].object_type, 2);
    }

    #[test]
    fn test_empty_parameter_block_round_trips() {
        let doc = SetDocument::new(vec![object(0x05, Vec::new())]);
        let bytes = doc.to_bytes().unwrap();

        assert_eq!(bytes.len(), SET_HEADER_SIZE + SET_RECORD_SIZE);
        let decoded = SetDocument::parse(&bytes).unwrap();
        assert!(decoded.objects[0].misc_data.is_empty());
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_round_trip_is_byte_exact() {
        let doc = SetDocument::new(vec![
            object(0x01, vec![3000, -1]),
            object(0x10, Vec::new()),
            object(0x31, vec![7, 8, 9]),
        ]);
        let bytes = doc.to_bytes().unwrap();
        let decoded = SetDocument::parse(&bytes).unwrap();

        assert_eq!(decoded, doc);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_header_total_is_backpatched() {
        let doc = SetDocument::new(vec![object(1, vec![1, 2]), object(2, vec![3])]);
        let bytes = doc.to_bytes().unwrap();

        assert_eq!(&bytes[..4], b"sky2");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 12);
        let region = SET_HEADER_SIZE + 2 * SET_RECORD_SIZE;
        assert_eq!(i32::from_le_bytes(bytes[region..region + 4].try_into().unwrap()), 1);
    }

    #[test]
    fn test_parameter_block_past_region_fails() {
        // Second object claims 8 bytes but only 4 remain in the region.
        let data = raw_set(&[(4, 1), (8, 2)], &[1, 2]);
        match SetDocument::parse(&data) {
            Err(Error::InvalidParameterLayout {
                object,
                cursor,
                length,
                region_end,
            }) => {
                assert_eq!(object, 1);
                assert_eq!(cursor, SET_HEADER_SIZE + 2 * SET_RECORD_SIZE + 4);
                assert_eq!(length, 8);
                assert_eq!(region_end, SET_HEADER_SIZE + 2 * SET_RECORD_SIZE + 8);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_negative_parameter_length_fails() {
        let data = raw_set(&[(-4, 1)], &[]);
        assert!(matches!(
            SetDocument::parse(&data),
            Err(Error::InvalidParameterLayout { length: -4, .. })
        ));
    }

    #[test]
    fn test_bad_magic_fails() {
        let mut data = raw_set(&[], &[]);
        data[..4].copy_from_slice(b"sky1");
        assert!(matches!(
            SetDocument::parse(&data),
            Err(Error::Common(gcasset_common::Error::InvalidMagic { .. }))
        ));
    }

    #[test]
    fn test_truncated_records_fail() {
        let data = raw_set(&[(0, 1), (0, 2)], &[]);
        assert!(SetDocument::parse(&data[..data.len() - 1]).is_err());
    }

    #[test]
    fn test_catalog_kind() {
        assert_eq!(object(0x01, Vec::new()).kind().map(|k| k.prefab), Some("spring"));
        assert!(object(0xEE, Vec::new()).kind().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.set");
        let doc = SetDocument::new(vec![object(0x04, vec![20])]);

        doc.write_to_file(&path).unwrap();
        assert_eq!(SetDocument::from_file(&path).unwrap(), doc);
    }
}

//! Transform instance chunk (`INST`).
//!
//! The chunk holds two independent, separately counted record arrays. Nothing
//! in either array points into the other or into the geometry set.
//!
//! Transform record (80 bytes): 4x4 matrix, matrix index, two opaque words,
//! 4 reserved zero bytes.
//!
//! Parameter record (96 bytes): 64 reserved zero bytes, three floats, a
//! reserved word that is always 1, a fourth float, 8 reserved zero bytes, a
//! fifth float.

use gcasset_common::{BinaryReader, BinaryWriter, Matrix4};

use crate::chunk::{read_chunk, write_chunk, ChunkTag};
use crate::error::{count_u32, Result};

/// Size of the zero block that opens every parameter record.
const PARAMS_RESERVED_BLOCK: usize = 0x40;

/// A transform record.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceTransform {
    pub matrix: Matrix4,
    pub matrix_index: u32,
    /// Two words of unknown meaning, preserved as-is.
    pub opaque: [u32; 2],
}

impl InstanceTransform {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let matrix = reader.read_matrix4()?;
        let matrix_index = reader.read_u32()?;
        let opaque = [reader.read_u32()?, reader.read_u32()?];
        reader.skip(4)?;
        Ok(Self {
            matrix,
            matrix_index,
            opaque,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) {
        writer.write_matrix4(&self.matrix);
        writer.write_u32(self.matrix_index);
        writer.write_u32(self.opaque[0]);
        writer.write_u32(self.opaque[1]);
        writer.write_zeros(4);
    }
}

/// A parameter record: five floats of unknown meaning, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceParams {
    pub values: [f32; 5],
}

impl InstanceParams {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.skip(PARAMS_RESERVED_BLOCK)?;
        let mut values = [0.0f32; 5];
        values[0] = reader.read_f32()?;
        values[1] = reader.read_f32()?;
        values[2] = reader.read_f32()?;
        reader.skip(4)?;
        values[3] = reader.read_f32()?;
        reader.skip(8)?;
        values[4] = reader.read_f32()?;
        Ok(Self { values })
    }

    fn write(&self, writer: &mut BinaryWriter) {
        let [f1, f2, f3, f4, f5] = self.values;
        writer.write_zeros(PARAMS_RESERVED_BLOCK);
        writer.write_f32(f1);
        writer.write_f32(f2);
        writer.write_f32(f3);
        writer.write_u32(1);
        writer.write_f32(f4);
        writer.write_zeros(8);
        writer.write_f32(f5);
    }
}

/// The contents of an `INST` chunk.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceTable {
    pub transforms: Vec<InstanceTransform>,
    pub params: Vec<InstanceParams>,
}

impl InstanceTable {
    /// Decode a complete `INST` chunk at the reader's position.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        read_chunk(reader, ChunkTag::INSTANCES, |reader, _| {
            let transform_count = reader.read_u32()?;
            let mut transforms = Vec::with_capacity(transform_count.min(0x1000) as usize);
            for _ in 0..transform_count {
                transforms.push(InstanceTransform::read(reader)?);
            }

            let params_count = reader.read_u32()?;
            let mut params = Vec::with_capacity(params_count.min(0x1000) as usize);
            for _ in 0..params_count {
                params.push(InstanceParams::read(reader)?);
            }

            tracing::debug!(
                transforms = transforms.len(),
                params = params.len(),
                "read instance table"
            );
            Ok(Self { transforms, params })
        })
    }

    /// Encode as a complete `INST` chunk.
    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        write_chunk(writer, ChunkTag::INSTANCES, |writer| {
            writer.write_u32(count_u32("instance transform", self.transforms.len())?);
            for transform in &self.transforms {
                transform.write(writer);
            }

            writer.write_u32(count_u32("instance parameter", self.params.len())?);
            for params in &self.params {
                params.write(writer);
            }
            Ok(())
        })
    }

    /// Decode a buffer holding a single `INST` chunk.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::read(&mut BinaryReader::new(data))
    }

    /// Encode into a fresh buffer holding a single `INST` chunk.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        self.write(&mut writer)?;
        Ok(writer.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InstanceTable {
        let mut matrix = Matrix4::IDENTITY;
        matrix.rows[3] = [4.0, 5.0, 6.0, 1.0];
        InstanceTable {
            transforms: vec![
                InstanceTransform {
                    matrix,
                    matrix_index: 2,
                    opaque: [0x11, 0xFFFF_FFFF],
                },
                InstanceTransform {
                    matrix: Matrix4::IDENTITY,
                    matrix_index: 0,
                    opaque: [0, 0],
                },
            ],
            params: vec![InstanceParams {
                values: [1.0, 2.0, 3.0, 4.0, 5.0],
            }],
        }
    }

    #[test]
    fn test_round_trip() {
        let table = sample();
        let bytes = table.to_bytes().unwrap();
        assert_eq!(InstanceTable::parse(&bytes).unwrap(), table);
    }

    #[test]
    fn test_record_sizes() {
        let bytes = sample().to_bytes().unwrap();
        // header 8, count 4, 2 * 80, count 4, 1 * 96
        assert_eq!(bytes.len(), 8 + 4 + 160 + 4 + 96);
        assert_eq!(&bytes[..4], b"TSNI");
        let size = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        assert_eq!(size, bytes.len() - 8);
    }

    #[test]
    fn test_params_layout_writes_constants() {
        let bytes = sample().to_bytes().unwrap();
        let record = &bytes[8 + 4 + 160 + 4..];

        assert!(record[..0x40].iter().all(|&b| b == 0));
        let word = |at: usize| u32::from_le_bytes(record[at..at + 4].try_into().unwrap());
        let float = |at: usize| f32::from_le_bytes(record[at..at + 4].try_into().unwrap());

        assert_eq!(float(0x40), 1.0);
        assert_eq!(float(0x44), 2.0);
        assert_eq!(float(0x48), 3.0);
        assert_eq!(word(0x4C), 1);
        assert_eq!(float(0x50), 4.0);
        assert_eq!(word(0x54), 0);
        assert_eq!(word(0x58), 0);
        assert_eq!(float(0x5C), 5.0);
    }

    #[test]
    fn test_arrays_are_independent() {
        let table = InstanceTable {
            transforms: Vec::new(),
            params: vec![InstanceParams::default(); 3],
        };
        let decoded = InstanceTable::parse(&table.to_bytes().unwrap()).unwrap();
        assert!(decoded.transforms.is_empty());
        assert_eq!(decoded.params.len(), 3);
    }

    #[test]
    fn test_truncated_table_fails() {
        let bytes = sample().to_bytes().unwrap();
        assert!(InstanceTable::parse(&bytes[..100]).is_err());
    }
}

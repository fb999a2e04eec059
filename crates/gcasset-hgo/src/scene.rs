//! A scene: an ordered sequence of top-level chunks.

use gcasset_common::{BinaryReader, BinaryWriter};

use crate::chunk::{write_chunk, ChunkHeader, ChunkTag, CHUNK_ALIGNMENT};
use crate::error::Result;
use crate::geometry::GeometrySet;
use crate::instance::InstanceTable;

/// One top-level chunk of a scene.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Section {
    Instances(InstanceTable),
    Geometry(GeometrySet),
    /// A chunk this crate does not decode; its body is kept byte for byte.
    Raw { tag: ChunkTag, body: Vec<u8> },
}

impl Section {
    /// The tag this section is written under.
    pub fn tag(&self) -> ChunkTag {
        match self {
            Section::Instances(_) => ChunkTag::INSTANCES,
            Section::Geometry(_) => ChunkTag::GEOMETRY,
            Section::Raw { tag, .. } => *tag,
        }
    }

    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let header = ChunkHeader::peek(reader)?;
        match header.tag {
            ChunkTag::INSTANCES => InstanceTable::read(reader).map(Section::Instances),
            ChunkTag::GEOMETRY => GeometrySet::read(reader).map(Section::Geometry),
            tag => {
                ChunkHeader::read(reader)?;
                let body = reader.read_bytes(header.size as usize)?.to_vec();
                reader.align(CHUNK_ALIGNMENT)?;
                tracing::debug!(tag = %tag, size = header.size, "kept opaque chunk");
                Ok(Section::Raw { tag, body })
            }
        }
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        match self {
            Section::Instances(table) => table.write(writer),
            Section::Geometry(set) => set.write(writer),
            Section::Raw { tag, body } => write_chunk(writer, *tag, |writer| {
                writer.write_bytes(body);
                Ok(())
            }),
        }
    }
}

/// An in-memory scene: instance tables, geometry sets and any other chunks,
/// in file order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scene {
    pub sections: Vec<Section>,
}

impl Scene {
    /// Decode every chunk in `data`, in order, until the buffer is exhausted.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let mut sections = Vec::new();

        while !reader.is_empty() {
            sections.push(Section::read(&mut reader)?);
        }

        tracing::debug!(sections = sections.len(), "parsed scene");
        Ok(Self { sections })
    }

    /// Encode every section, in order, into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        for section in &self.sections {
            section.write(&mut writer)?;
        }
        Ok(writer.finish()?)
    }

    /// All geometry sets, in file order.
    pub fn geometry(&self) -> impl Iterator<Item = &GeometrySet> {
        self.sections.iter().filter_map(|s| match s {
            Section::Geometry(set) => Some(set),
            _ => None,
        })
    }

    /// All instance tables, in file order.
    pub fn instances(&self) -> impl Iterator<Item = &InstanceTable> {
        self.sections.iter().filter_map(|s| match s {
            Section::Instances(table) => Some(table),
            _ => None,
        })
    }
}

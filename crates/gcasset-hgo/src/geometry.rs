//! Geometry set chunk (`GST0`).
//!
//! A geometry set is a list of geometry entries. Each entry starts with a
//! constant marker (1) and a kind discriminator that selects one of two body
//! layouts:
//!
//! - kind 0, mesh geometry: 12 reserved bytes, then meshes with full vertices
//!   (position, normal, colour, uv) and one primitive each.
//! - any other kind, plane geometry: meshes with an extra discriminator word
//!   and reduced vertices (position, uv, colour), no primitive.
//!
//! Primitives come in two encodings, see [`Primitive`].

use std::num::NonZeroU32;

use gcasset_common::{BinaryReader, BinaryWriter, Vector2, Vector3};

use crate::chunk::{read_chunk, write_chunk, ChunkTag};
use crate::error::{count_u32, Error, Result};

/// Marker word that precedes every geometry entry.
const GEOMETRY_MARKER: u32 = 1;

/// Primitive type code for a flat list of triangle indices.
pub const PRIMITIVE_FACE_LIST: u32 = 5;
/// Primitive type code for a set of triangle strips.
pub const PRIMITIVE_TRIANGLE_STRIPS: u32 = 6;

/// A vertex of a kind-0 mesh. On disk: position, normal, colour, uv (36 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshVertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub colour: [u8; 4],
    pub uv: Vector2,
}

impl MeshVertex {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            position: reader.read_vector3()?,
            normal: reader.read_vector3()?,
            colour: reader.read_array()?,
            uv: reader.read_vector2()?,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) {
        writer.write_vector3(self.position);
        writer.write_vector3(self.normal);
        writer.write_bytes(&self.colour);
        writer.write_vector2(self.uv);
    }
}

/// A vertex of a plane mesh. On disk: position, uv, colour (24 bytes).
///
/// In the known files the position places the plane in the world and the uv
/// pair holds its scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaneVertex {
    pub position: Vector3,
    pub uv: Vector2,
    pub colour: [u8; 4],
}

impl PlaneVertex {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            position: reader.read_vector3()?,
            uv: reader.read_vector2()?,
            colour: reader.read_array()?,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) {
        writer.write_vector3(self.position);
        writer.write_vector2(self.uv);
        writer.write_bytes(&self.colour);
    }
}

/// Face data of a kind-0 mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Primitive {
    /// Type 5: independent triangles, three indices each.
    FaceList(Vec<u16>),
    /// Type 6: strips, each a run of indices where every new index forms a
    /// triangle with the two before it.
    TriangleStrips(Vec<Vec<u16>>),
}

impl Primitive {
    /// The on-disk type code.
    pub fn type_code(&self) -> u32 {
        match self {
            Primitive::FaceList(_) => PRIMITIVE_FACE_LIST,
            Primitive::TriangleStrips(_) => PRIMITIVE_TRIANGLE_STRIPS,
        }
    }

    /// Number of 16-bit words the encoding occupies (the "short count").
    ///
    /// For strips this includes one length word per strip.
    pub fn word_count(&self) -> usize {
        match self {
            Primitive::FaceList(indices) => indices.len(),
            Primitive::TriangleStrips(strips) => strips.iter().map(|s| 1 + s.len()).sum(),
        }
    }

    /// Total number of vertex indices, excluding strip length words.
    pub fn index_count(&self) -> usize {
        match self {
            Primitive::FaceList(indices) => indices.len(),
            Primitive::TriangleStrips(strips) => strips.iter().map(Vec::len).sum(),
        }
    }

    /// Number of triangles the encoding describes, degenerate ones included.
    pub fn triangle_count(&self) -> usize {
        match self {
            Primitive::FaceList(indices) => indices.len() / 3,
            Primitive::TriangleStrips(strips) => {
                strips.iter().map(|s| s.len().saturating_sub(2)).sum()
            }
        }
    }

    /// Expand either encoding into independent triangles.
    ///
    /// Strip triangles alternate winding so every triangle faces the same way;
    /// degenerate strip triangles (a repeated index) are dropped.
    pub fn triangles(&self) -> Vec<[u16; 3]> {
        match self {
            Primitive::FaceList(indices) => indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect(),
            Primitive::TriangleStrips(strips) => {
                let mut out = Vec::with_capacity(self.triangle_count());
                for strip in strips {
                    for (i, w) in strip.windows(3).enumerate() {
                        let (a, b, c) = (w[0], w[1], w[2]);
                        if a == b || b == c || a == c {
                            continue;
                        }
                        if i % 2 == 0 {
                            out.push([a, b, c]);
                        } else {
                            out.push([b, a, c]);
                        }
                    }
                }
                out
            }
        }
    }

    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let offset = reader.position();
        let code = reader.read_u32()?;
        let short_count = reader.read_u32()?;

        match code {
            PRIMITIVE_TRIANGLE_STRIPS => {
                let strips = read_strips(reader, offset, short_count)?;
                Ok(Primitive::TriangleStrips(strips))
            }
            PRIMITIVE_FACE_LIST => {
                let mut indices = Vec::with_capacity(short_count.min(0x10000) as usize);
                for _ in 0..short_count {
                    indices.push(reader.read_u16()?);
                }
                Ok(Primitive::FaceList(indices))
            }
            code => Err(Error::UnsupportedPrimitiveType { offset, code }),
        }
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_u32(self.type_code());

        match self {
            Primitive::FaceList(indices) => {
                writer.write_u32(count_u32("face index", indices.len())?);
                for &index in indices {
                    writer.write_u16(index);
                }
            }
            Primitive::TriangleStrips(strips) => {
                let words_name = writer.unique_name("strip words");
                writer.reserve_offset(words_name.clone());

                let mut words = 0usize;
                for strip in strips {
                    let length = u16::try_from(strip.len()).map_err(|_| Error::CountOverflow {
                        what: "strip index",
                        count: strip.len(),
                    })?;
                    writer.write_u16(length);
                    words += 1;

                    for &index in strip {
                        writer.write_u16(index);
                        words += 1;
                    }
                }

                writer.resolve_offset_value(&words_name, count_u32("strip word", words)?)?;
            }
        }
        Ok(())
    }
}

/// Decode strips until exactly `short_count` words have been consumed.
///
/// The number of strips is not stored; it falls out of the word budget. Every
/// length word counts against the budget along with the indices it announces.
fn read_strips(reader: &mut BinaryReader<'_>, offset: usize, short_count: u32) -> Result<Vec<Vec<u16>>> {
    let mut strips = Vec::new();
    let mut consumed: u32 = 0;

    while consumed < short_count {
        let length = reader.read_u16()?;
        consumed += 1;

        let mut strip = Vec::with_capacity(length as usize);
        for _ in 0..length {
            strip.push(reader.read_u16()?);
        }
        consumed = consumed.saturating_add(u32::from(length));
        strips.push(strip);
    }

    if consumed != short_count {
        return Err(Error::StripBudgetExceeded {
            offset,
            declared: short_count,
            consumed,
        });
    }

    Ok(strips)
}

/// A kind-0 mesh: material, full vertices and one primitive.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    pub material_index: u32,
    pub vertices: Vec<MeshVertex>,
    pub primitive: Primitive,
}

impl Mesh {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let material_index = reader.read_u32()?;
        let vertex_count = reader.read_u32()?;

        let mut vertices = Vec::with_capacity(vertex_count.min(0x10000) as usize);
        for _ in 0..vertex_count {
            vertices.push(MeshVertex::read(reader)?);
        }

        // Reserved pair, 0 then 1 in every known file.
        reader.skip(8)?;
        let primitive = Primitive::read(reader)?;
        reader.skip(8)?;

        tracing::trace!(
            material_index,
            vertices = vertices.len(),
            primitive = primitive.type_code(),
            "read mesh"
        );

        Ok(Self {
            material_index,
            vertices,
            primitive,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_u32(self.material_index);
        writer.write_u32(count_u32("vertex", self.vertices.len())?);
        for vertex in &self.vertices {
            vertex.write(writer);
        }

        writer.write_u32(0);
        writer.write_u32(1);
        self.primitive.write(writer)?;
        writer.write_zeros(8);
        Ok(())
    }
}

/// A plane mesh: material, an opaque discriminator and reduced vertices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaneMesh {
    pub material_index: u32,
    /// Seen as 0 or 1; meaning unknown, preserved as-is.
    pub discriminator: u32,
    pub vertices: Vec<PlaneVertex>,
}

impl PlaneMesh {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let material_index = reader.read_u32()?;
        let vertex_count = reader.read_u32()?;
        let discriminator = reader.read_u32()?;
        reader.skip(4)?;

        let mut vertices = Vec::with_capacity(vertex_count.min(0x10000) as usize);
        for _ in 0..vertex_count {
            vertices.push(PlaneVertex::read(reader)?);
        }

        Ok(Self {
            material_index,
            discriminator,
            vertices,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_u32(self.material_index);
        writer.write_u32(count_u32("vertex", self.vertices.len())?);
        writer.write_u32(self.discriminator);
        writer.write_zeros(4);
        for vertex in &self.vertices {
            vertex.write(writer);
        }
        Ok(())
    }
}

/// One geometry entry, with its layout chosen by the kind discriminator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Geometry {
    /// Kind 0.
    Mesh(Vec<Mesh>),
    /// Any non-zero kind; the exact value is kept for round-tripping.
    Plane {
        kind: NonZeroU32,
        meshes: Vec<PlaneMesh>,
    },
}

impl Geometry {
    /// The on-disk kind discriminator.
    pub fn kind(&self) -> u32 {
        match self {
            Geometry::Mesh(_) => 0,
            Geometry::Plane { kind, .. } => kind.get(),
        }
    }

    /// Number of meshes in this entry.
    pub fn mesh_count(&self) -> usize {
        match self {
            Geometry::Mesh(meshes) => meshes.len(),
            Geometry::Plane { meshes, .. } => meshes.len(),
        }
    }

    /// Number of vertices across all meshes.
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Mesh(meshes) => meshes.iter().map(|m| m.vertices.len()).sum(),
            Geometry::Plane { meshes, .. } => meshes.iter().map(|m| m.vertices.len()).sum(),
        }
    }

    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.skip(4)?;
        let kind = reader.read_u32()?;

        match NonZeroU32::new(kind) {
            None => {
                reader.skip(12)?;
                let mesh_count = reader.read_u32()?;
                let mut meshes = Vec::with_capacity(mesh_count.min(0x1000) as usize);
                for _ in 0..mesh_count {
                    meshes.push(Mesh::read(reader)?);
                }
                Ok(Geometry::Mesh(meshes))
            }
            Some(kind) => {
                let mesh_count = reader.read_u32()?;
                let mut meshes = Vec::with_capacity(mesh_count.min(0x1000) as usize);
                for _ in 0..mesh_count {
                    meshes.push(PlaneMesh::read(reader)?);
                }
                Ok(Geometry::Plane { kind, meshes })
            }
        }
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_u32(GEOMETRY_MARKER);
        writer.write_u32(self.kind());

        match self {
            Geometry::Mesh(meshes) => {
                writer.write_zeros(12);
                writer.write_u32(count_u32("mesh", meshes.len())?);
                for mesh in meshes {
                    mesh.write(writer)?;
                }
            }
            Geometry::Plane { meshes, .. } => {
                writer.write_u32(count_u32("mesh", meshes.len())?);
                for mesh in meshes {
                    mesh.write(writer)?;
                }
            }
        }
        Ok(())
    }
}

/// The contents of a `GST0` chunk.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometrySet {
    pub geometries: Vec<Geometry>,
}

impl GeometrySet {
    /// Create a geometry set from its entries.
    pub fn new(geometries: Vec<Geometry>) -> Self {
        Self { geometries }
    }

    /// Decode a complete `GST0` chunk at the reader's position.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        read_chunk(reader, ChunkTag::GEOMETRY, |reader, _| {
            let count = reader.read_u32()?;
            let mut geometries = Vec::with_capacity(count.min(0x1000) as usize);
            for _ in 0..count {
                geometries.push(Geometry::read(reader)?);
            }
            tracing::debug!(geometries = geometries.len(), "read geometry set");
            Ok(Self { geometries })
        })
    }

    /// Encode as a complete `GST0` chunk.
    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        write_chunk(writer, ChunkTag::GEOMETRY, |writer| {
            writer.write_u32(count_u32("geometry", self.geometries.len())?);
            for geometry in &self.geometries {
                geometry.write(writer)?;
            }
            Ok(())
        })
    }

    /// Decode a buffer holding a single `GST0` chunk.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::read(&mut BinaryReader::new(data))
    }

    /// Encode into a fresh buffer holding a single `GST0` chunk.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        self.write(&mut writer)?;
        Ok(writer.finish()?)
    }
}

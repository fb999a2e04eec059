//! HGO scene container codec.
//!
//! HGO scenes are a flat sequence of chunks (4-byte tag, 4-byte size, body,
//! zero padding to a 4-byte boundary). This crate decodes and re-encodes the
//! two chunk types whose layout is understood and keeps every other chunk as
//! opaque bytes:
//!
//! - `INST` - two independent transform/parameter record arrays
//! - `GST0` - geometry sets, with meshes whose faces are stored either as a
//!   triangle list or as a word-budgeted set of triangle strips
//!
//! Tags are stored byte-reversed on disk (`GST0` is written as `0TSG`).
//!
//! # Example
//!
//! ```no_run
//! use gcasset_hgo::{Scene, Section};
//!
//! let data = std::fs::read("level.hgo")?;
//! let scene = Scene::parse(&data)?;
//!
//! for set in scene.geometry() {
//!     for geometry in &set.geometries {
//!         println!("kind {}: {} meshes", geometry.kind(), geometry.mesh_count());
//!     }
//! }
//!
//! // Re-encode (byte-exact for files written by this crate)
//! let bytes = scene.to_bytes()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod chunk;
mod error;
pub mod geometry;
pub mod instance;
mod scene;

pub use chunk::{ChunkHeader, ChunkTag};
pub use error::{Error, Result};
pub use geometry::{Geometry, GeometrySet, Mesh, MeshVertex, PlaneMesh, PlaneVertex, Primitive};
pub use instance::{InstanceParams, InstanceTable, InstanceTransform};
pub use scene::{Scene, Section};

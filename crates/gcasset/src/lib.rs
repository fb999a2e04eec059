//! gcasset - codecs for early-2000s game asset containers.
//!
//! This crate provides a unified interface to the format crates:
//!
//! # Crates
//!
//! - [`gcasset_common`] - Byte cursors with deferred offsets, vector/matrix types
//! - [`gcasset_hgo`] - HGO chunked scenes (instance tables, geometry sets)
//! - [`gcasset_set`] - SET object placement tables
//! - [`gcasset_one`] - ONE indexed archives with PRS compression
//!
//! # Example
//!
//! ```no_run
//! use gcasset::prelude::*;
//!
//! let archive = Archive::from_file("stage01.one", true)?;
//!
//! if let Some(entry) = archive.find("stage01.set") {
//!     let doc = SetDocument::parse(&entry.data)?;
//!     println!("Objects: {}", doc.objects.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use gcasset_common as common;
pub use gcasset_hgo as hgo;
pub use gcasset_one as one;
pub use gcasset_set as set;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use gcasset_common::{BinaryReader, BinaryWriter, Matrix4, Vector2, Vector3};
    pub use gcasset_hgo::{Geometry, GeometrySet, InstanceTable, Primitive, Scene, Section};
    pub use gcasset_one::{Archive, ArchiveEntry, Compressor, Prs};
    pub use gcasset_set::{SetDocument, SetObject};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

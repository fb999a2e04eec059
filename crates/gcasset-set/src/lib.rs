//! SET object placement table codec.
//!
//! A SET file lists placed objects. It is laid out in two regions:
//!
//! - a 12-byte header (`sky2`, object count, total parameter bytes) followed
//!   by one 0x2C-byte record per object
//! - a parameter region, starting right after the last record, holding every
//!   object's parameter block back to back
//!
//! Records only carry the byte length of their parameter block, so decoding
//! walks the records and the parameter region with two independent cursors.
//!
//! # Example
//!
//! ```no_run
//! use gcasset_set::SetDocument;
//!
//! let doc = SetDocument::from_file("stage01.set")?;
//! for object in &doc.objects {
//!     let label = object.kind().map(|k| k.label).unwrap_or("unknown");
//!     println!("{label} at {:?} with {} params", object.position, object.misc_data.len());
//! }
//! # Ok::<(), gcasset_set::Error>(())
//! ```

pub mod catalog;
mod error;
mod file;
mod record;

pub use catalog::ObjectKind;
pub use error::{Error, Result};
pub use file::{SetDocument, SetObject, SET_MAGIC};
pub use record::{SET_HEADER_SIZE, SET_RECORD_SIZE};

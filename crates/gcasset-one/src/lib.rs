//! ONE indexed archive codec.
//!
//! A ONE archive is a 16-byte header, a directory of fixed 0x30-byte records
//! (name, index, absolute payload offset, payload length, one opaque word)
//! and the payload bytes. Payloads are usually PRS-compressed; decoding and
//! encoding take a flag, or any [`Compressor`], to handle that.
//!
//! Recompressing a decoded archive yields valid PRS streams, but not the same
//! bytes the original tools produced.
//!
//! # Example
//!
//! ```no_run
//! use gcasset_one::Archive;
//!
//! let archive = Archive::from_file("stage01.one", true)?;
//! for entry in &archive.entries {
//!     println!("{}: {} bytes", entry.name, entry.data.len());
//! }
//! archive.extract("stage01")?;
//! # Ok::<(), gcasset_one::Error>(())
//! ```

mod archive;
mod compression;
mod error;
pub mod prs;

pub use archive::{Archive, ArchiveEntry, ONE_HEADER_SIZE, ONE_NAME_SIZE, ONE_RECORD_SIZE};
pub use compression::Compressor;
pub use error::{Error, Result};
pub use prs::Prs;

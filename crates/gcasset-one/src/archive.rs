//! ONE archive decoding and encoding.

use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path};

use gcasset_common::{BinaryReader, BinaryWriter};

use crate::compression::Compressor;
use crate::prs::Prs;
use crate::{Error, Result};

/// Size of the archive header.
pub const ONE_HEADER_SIZE: usize = 0x10;

/// Size of one directory record: name field, index, offset, length, opaque word.
pub const ONE_RECORD_SIZE: usize = ONE_NAME_SIZE + 4 * 4;

/// Width of the null-padded name field in a directory record.
pub const ONE_NAME_SIZE: usize = 0x20;

/// Value of the header word that follows the file count.
const HEADER_CONSTANT: u32 = 0x10;

const PAYLOAD_START: &str = "payload start";

/// A file stored in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchiveEntry {
    pub name: String,
    /// Index field of the directory record, written back unchanged.
    pub index: i32,
    /// Trailing directory word; meaning unknown.
    pub opaque: u32,
    /// Payload bytes, decompressed or raw depending on how the archive was read.
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    /// Create an entry with a zero index and opaque word.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            ..Default::default()
        }
    }
}

/// An indexed file archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Archive {
    pub entries: Vec<ArchiveEntry>,
    /// Last header word, seen as all zero or all `0xFF` bytes.
    pub flags: [u8; 4],
}

impl Archive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by name.
    pub fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Append a file, indexed by its position in the directory.
    ///
    /// Fails once the position no longer fits the signed 32-bit index field.
    pub fn push(&mut self, name: impl Into<String>, data: Vec<u8>) -> Result<()> {
        let index = i32::try_from(self.entries.len()).map_err(|_| Error::CountOverflow {
            what: "entry index",
            count: self.entries.len(),
        })?;
        self.entries.push(ArchiveEntry {
            index,
            ..ArchiveEntry::new(name, data)
        });
        Ok(())
    }

    /// Read a ONE file from disk, PRS-decompressing payloads if asked to.
    pub fn from_file<P: AsRef<Path>>(path: P, decompress: bool) -> Result<Self> {
        let data = fs::read(path)?;
        Self::parse(&data, decompress)
    }

    /// Write to a ONE file on disk, PRS-compressing payloads if asked to.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, compress: bool) -> Result<()> {
        fs::write(path, self.to_bytes(compress)?)?;
        Ok(())
    }

    /// Decode an archive, PRS-decompressing payloads if asked to.
    pub fn parse(data: &[u8], decompress: bool) -> Result<Self> {
        if decompress {
            Self::parse_with(data, Some(&Prs))
        } else {
            Self::parse_with(data, None)
        }
    }

    /// Decode an archive, passing each payload through `codec` if given.
    pub fn parse_with(data: &[u8], codec: Option<&dyn Compressor>) -> Result<Self> {
        let mut reader = BinaryReader::new(data);

        let count = reader.read_u32()? as usize;
        let constant = reader.read_u32()?;
        let payload_start = reader.read_u32()?;
        let flags = reader.read_array::<4>()?;

        if constant != HEADER_CONSTANT {
            tracing::warn!(constant, "unexpected ONE header word");
        }
        tracing::debug!(count, payload_start, ?flags, "reading ONE");

        // Each record needs 0x30 bytes; a count the buffer cannot hold fails on
        // the first missing record rather than on a huge allocation.
        let mut entries = Vec::with_capacity(count.min(reader.remaining() / ONE_RECORD_SIZE));

        for _ in 0..count {
            let name = reader.read_padded_string(ONE_NAME_SIZE)?.to_string();
            let index = reader.read_i32()?;
            let offset = reader.read_u32()? as usize;
            let length = reader.read_u32()? as usize;
            let opaque = reader.read_u32()?;

            let directory = reader.position();
            reader.seek(offset)?;
            let raw = reader.read_bytes(length)?;
            reader.seek(directory)?;

            let data = match codec {
                Some(codec) => codec.decompress(raw)?,
                None => raw.to_vec(),
            };

            tracing::trace!(%name, index, offset, length, unpacked = data.len(), "entry");

            entries.push(ArchiveEntry {
                name,
                index,
                opaque,
                data,
            });
        }

        Ok(Self { entries, flags })
    }

    /// Encode into a fresh buffer, PRS-compressing payloads if asked to.
    pub fn to_bytes(&self, compress: bool) -> Result<Vec<u8>> {
        if compress {
            self.to_bytes_with(Some(&Prs))
        } else {
            self.to_bytes_with(None)
        }
    }

    /// Encode into a fresh buffer, passing each payload through `codec` if given.
    ///
    /// Payloads are stored after the directory in entry order.
    pub fn to_bytes_with(&self, codec: Option<&dyn Compressor>) -> Result<Vec<u8>> {
        let payloads = self
            .entries
            .iter()
            .map(|entry| match codec {
                Some(codec) => codec.compress(&entry.data).map(Cow::Owned),
                None => Ok(Cow::Borrowed(entry.data.as_slice())),
            })
            .collect::<Result<Vec<_>>>()?;

        let payload_bytes: usize = payloads.iter().map(|p| p.len()).sum();
        let mut writer = BinaryWriter::with_capacity(
            ONE_HEADER_SIZE + self.entries.len() * ONE_RECORD_SIZE + payload_bytes,
        );

        let count = u32::try_from(self.entries.len()).map_err(|_| Error::CountOverflow {
            what: "entry count",
            count: self.entries.len(),
        })?;
        writer.write_u32(count);
        writer.write_u32(HEADER_CONSTANT);
        writer.reserve_offset(PAYLOAD_START);
        writer.write_bytes(&self.flags);

        for (i, (entry, payload)) in self.entries.iter().zip(&payloads).enumerate() {
            if entry.name.len() > ONE_NAME_SIZE {
                return Err(Error::NameTooLong {
                    name: entry.name.clone(),
                    max: ONE_NAME_SIZE,
                });
            }
            let length = u32::try_from(payload.len()).map_err(|_| Error::CountOverflow {
                what: "payload length",
                count: payload.len(),
            })?;

            writer.write_padded_string(&entry.name, ONE_NAME_SIZE);
            writer.write_i32(entry.index);
            writer.reserve_offset(payload_name(i));
            writer.write_u32(length);
            writer.write_u32(entry.opaque);
        }

        writer.resolve_offset(PAYLOAD_START)?;
        for (i, payload) in payloads.iter().enumerate() {
            writer.resolve_offset(&payload_name(i))?;
            writer.write_bytes(payload);
        }

        Ok(writer.finish()?)
    }

    /// Write every entry to `<dir>/<name>`, creating `dir` if needed.
    ///
    /// Fails before writing anything if a name is not a single plain path
    /// component.
    pub fn extract<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        for entry in &self.entries {
            check_plain_name(&entry.name)?;
        }

        fs::create_dir_all(dir)?;
        for entry in &self.entries {
            fs::write(dir.join(&entry.name), &entry.data)?;
        }
        Ok(())
    }
}

fn payload_name(index: usize) -> String {
    format!("payload {index}")
}

fn check_plain_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let plain = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !name.contains(['/', '\\', ':']);
    if plain {
        Ok(())
    } else {
        Err(Error::UnsafeName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a raw archive by hand, storing payloads in reverse directory order.
    fn raw_archive(files: &[(&str, &[u8], u32)], flags: [u8; 4]) -> Vec<u8> {
        let directory_end = ONE_HEADER_SIZE + files.len() * ONE_RECORD_SIZE;
        let mut offsets = vec![0usize; files.len()];
        let mut cursor = directory_end;
        for (i, (_, data, _)) in files.iter().enumerate().rev() {
            offsets[i] = cursor;
            cursor += data.len();
        }

        let mut out = Vec::new();
        out.extend_from_slice(&(files.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x10u32.to_le_bytes());
        out.extend_from_slice(&(directory_end as u32).to_le_bytes());
        out.extend_from_slice(&flags);
        for (i, (name, data, opaque)) in files.iter().enumerate() {
            let mut field = [0u8; ONE_NAME_SIZE];
            field[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&field);
            out.extend_from_slice(&(i as i32).to_le_bytes());
            out.extend_from_slice(&(offsets[i] as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&opaque.to_le_bytes());
        }
        for (_, data, _) in files.iter().rev() {
            out.extend_from_slice(data);
        }
        out
    }

    fn sample() -> Archive {
        let mut archive = Archive::new();
        archive.push("stage.bin", b"stage data stage data stage data".to_vec()).unwrap();
        archive.push("empty.dat", Vec::new()).unwrap();
        archive.push("model.hgo", vec![7; 300]).unwrap();
        archive.entries[1].opaque = 0xDEAD_BEEF;
        archive
    }

    #[test]
    fn test_payloads_are_read_by_absolute_offset() {
        let data = raw_archive(&[("a.bin", &b"first"[..], 1), ("b.bin", &b"second!"[..], 2)], [0xFF; 4]);
        let archive = Archive::parse(&data, false).unwrap();

        assert_eq!(archive.len(), 2);
        assert_eq!(archive.flags, [0xFF; 4]);
        assert_eq!(archive.entries[0].name, "a.bin");
        assert_eq!(archive.entries[0].data, b"first");
        assert_eq!(archive.entries[0].opaque, 1);
        assert_eq!(archive.entries[1].index, 1);
        assert_eq!(archive.find("b.bin").map(|e| e.data.as_slice()), Some(&b"second!"[..]));
    }

    #[test]
    fn test_uncompressed_round_trip_is_byte_exact() {
        let archive = sample();
        let bytes = archive.to_bytes(false).unwrap();
        let decoded = Archive::parse(&bytes, false).unwrap();
        assert_eq!(decoded, archive);
        assert_eq!(decoded.to_bytes(false).unwrap(), bytes);
    }

    #[test]
    fn test_header_and_offsets_are_backpatched() {
        let bytes = sample().to_bytes(false).unwrap();
        let directory_end = ONE_HEADER_SIZE + 3 * ONE_RECORD_SIZE;

        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0x10u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(directory_end as u32).to_le_bytes());

        // first record's offset field follows the name and index
        let field = ONE_HEADER_SIZE + ONE_NAME_SIZE + 4;
        assert_eq!(&bytes[field..field + 4], &(directory_end as u32).to_le_bytes());
        assert_eq!(&bytes[directory_end..directory_end + 10], b"stage data");
    }

    #[test]
    fn test_index_is_preserved() {
        let mut archive = Archive::new();
        archive.entries.push(ArchiveEntry {
            index: 42,
            ..ArchiveEntry::new("x", vec![1])
        });
        let decoded = Archive::parse(&archive.to_bytes(false).unwrap(), false).unwrap();
        assert_eq!(decoded.entries[0].index, 42);
    }

    #[test]
    fn test_compressed_round_trip() {
        let archive = sample();
        let packed = archive.to_bytes(true).unwrap();
        assert_eq!(Archive::parse(&packed, true).unwrap(), archive);

        let raw = Archive::parse(&packed, false).unwrap();
        assert_eq!(Prs.decompress(&raw.entries[2].data).unwrap(), vec![7; 300]);
    }

    #[test]
    fn test_empty_archive() {
        let bytes = Archive::new().to_bytes(false).unwrap();
        assert_eq!(bytes.len(), ONE_HEADER_SIZE);
        assert_eq!(&bytes[8..12], &0x10u32.to_le_bytes());
        assert!(Archive::parse(&bytes, false).unwrap().is_empty());
    }

    #[test]
    fn test_name_fills_whole_field() {
        let name = "a".repeat(ONE_NAME_SIZE);
        let mut archive = Archive::new();
        archive.push(name.clone(), vec![1, 2]).unwrap();
        let decoded = Archive::parse(&archive.to_bytes(false).unwrap(), false).unwrap();
        assert_eq!(decoded.entries[0].name, name);
    }

    #[test]
    fn test_long_name_fails() {
        let mut archive = Archive::new();
        archive.push("b".repeat(ONE_NAME_SIZE + 1), vec![]).unwrap();
        assert!(matches!(
            archive.to_bytes(false),
            Err(Error::NameTooLong { max: ONE_NAME_SIZE, .. })
        ));
    }

    #[test]
    fn test_directory_records_are_0x30_bytes() {
        assert_eq!(ONE_RECORD_SIZE, 0x30);

        let mut archive = Archive::new();
        archive.push("a.bin", vec![1, 2, 3]).unwrap();
        archive.push("b.bin", vec![4]).unwrap();
        let bytes = archive.to_bytes(false).unwrap();

        let directory_end = (ONE_HEADER_SIZE + 2 * 0x30) as u32;
        assert_eq!(&bytes[8..12], &directory_end.to_le_bytes());
        // second record starts one stride in
        let second = ONE_HEADER_SIZE + 0x30;
        assert_eq!(&bytes[second..second + 5], b"b.bin");
        assert_eq!(&bytes[second + 0x20..second + 0x24], &1i32.to_le_bytes());
        assert_eq!(
            &bytes[second + 0x24..second + 0x28],
            &(directory_end + 3).to_le_bytes()
        );
        assert_eq!(bytes.len(), directory_end as usize + 4);
    }

    #[test]
    fn test_push_indexes_by_position() {
        let mut archive = Archive::new();
        for i in 0..3 {
            archive.push(format!("{i}.bin"), Vec::new()).unwrap();
        }
        let indices: Vec<i32> = archive.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_payload_offset_past_end_reports_seek() {
        let mut data = raw_archive(&[("a.bin", &b"abcd"[..], 0)], [0; 4]);
        let field = ONE_HEADER_SIZE + ONE_NAME_SIZE + 4;
        data[field..field + 4].copy_from_slice(&0x1000u32.to_le_bytes());
        let len = data.len();
        assert!(matches!(
            Archive::parse(&data, false),
            Err(Error::Common(gcasset_common::Error::SeekOutOfRange { position: 0x1000, len: l })) if l == len
        ));
    }

    #[test]
    fn test_payload_past_end_fails() {
        let mut data = raw_archive(&[("a.bin", &b"abcd"[..], 0)], [0; 4]);
        data.truncate(data.len() - 1);
        assert!(matches!(Archive::parse(&data, false), Err(Error::Common(_))));
    }

    #[test]
    fn test_bad_payload_fails_to_decompress() {
        let data = raw_archive(&[("a.bin", &[0x00u8, 0xFF][..], 0)], [0; 4]);
        assert!(matches!(Archive::parse(&data, true), Err(Error::Decompression(_))));
    }

    #[test]
    fn test_extract_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        sample().extract(&target).unwrap();

        assert_eq!(fs::read(target.join("model.hgo")).unwrap(), vec![7; 300]);
        assert!(fs::read(target.join("empty.dat")).unwrap().is_empty());
    }

    #[test]
    fn test_extract_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../evil", "sub/file", "..", "", "c:\\x"] {
            let mut archive = Archive::new();
            archive.push(name, vec![1]).unwrap();
            assert!(
                matches!(archive.extract(dir.path()), Err(Error::UnsafeName(_))),
                "{name:?} accepted"
            );
        }
    }
}

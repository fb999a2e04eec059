//! Fixed-width SET object record.

use gcasset_common::little_endian::{F32, I32, U32};
use gcasset_common::Vector3;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size of the file header: magic, object count, parameter byte total.
pub const SET_HEADER_SIZE: usize = 0xC;

/// Size of one fixed object record.
pub const SET_RECORD_SIZE: usize = 0x2C;

/// On-disk layout of one object record.
///
/// The parameter block itself is not stored here; `param_length` only says
/// how many bytes of the shared parameter region belong to this object.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub(crate) struct SetRecord {
    pub position: [F32; 3],
    pub rotation: [F32; 3],
    pub tag_bytes: [u8; 4],
    pub opaque: [u8; 4],
    pub object_type: u8,
    pub object_list: u8,
    pub link_id: u8,
    pub render_distance: u8,
    pub param_length: I32,
    pub reserved: U32,
}

const _: () = assert!(std::mem::size_of::<SetRecord>() == SET_RECORD_SIZE);

pub(crate) fn vector_from_disk(v: [F32; 3]) -> Vector3 {
    Vector3::new(v[0].get(), v[1].get(), v[2].get())
}

pub(crate) fn vector_to_disk(v: Vector3) -> [F32; 3] {
    [F32::new(v.x), F32::new(v.y), F32::new(v.z)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let record = SetRecord {
            position: vector_to_disk(Vector3::new(1.0, 2.0, 3.0)),
            rotation: vector_to_disk(Vector3::ZERO),
            tag_bytes: [1, 2, 3, 4],
            opaque: [5, 6, 7, 8],
            object_type: 0x10,
            object_list: 0x25,
            link_id: 0x30,
            render_distance: 0x40,
            param_length: I32::new(8),
            reserved: U32::new(0xAABBCCDD),
        };
        let bytes = record.as_bytes();

        assert_eq!(bytes.len(), SET_RECORD_SIZE);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[24..28], &[1, 2, 3, 4]);
        assert_eq!(&bytes[32..36], &[0x10, 0x25, 0x30, 0x40]);
        assert_eq!(&bytes[36..40], &8i32.to_le_bytes());
        assert_eq!(&bytes[40..44], &0xAABBCCDDu32.to_le_bytes());
    }
}

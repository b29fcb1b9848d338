//! On-disk record layouts.
//!
//! Every fixed-size record in an LGP archive, as zerocopy structs. Integer
//! fields use zerocopy's little-endian wrappers so the layout is read the
//! same way on every host.
//!
//! ```text
//! 0       12 bytes  creator tag
//! 12      4 bytes   file count
//! 16      count x 27 bytes  TOC entries
//!         [lookup prefix + conflict table, only when an entry has conflicts]
//!         file data records at each entry's data offset
//! ```

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Length of the name field in TOC entries and file headers.
pub const NAME_LEN: usize = 20;

/// Length of a conflict member's subdirectory field.
pub const SUBDIR_LEN: usize = 128;

/// Buckets per lookup character; the lookup table is square.
pub const LOOKUP_VALUE_MAX: usize = 30;

/// Size of the lookup table that usually precedes the conflict table.
///
/// Each bucket is a `{u16 toc_offset, u16 file_count}` pair.
pub const TYPICAL_LOOKUP_PREFIX: usize = LOOKUP_VALUE_MAX * LOOKUP_VALUE_MAX * 4;

/// Archive header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawArchiveHeader {
    /// Opaque creator tag, `"\0\0SQUARESOFT"` in shipped archives
    pub creator: [u8; 12],
    /// Number of TOC entries
    pub file_count: U32,
}

impl RawArchiveHeader {
    /// Size on disk.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Table of contents record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawTocEntry {
    /// NUL-padded file name
    pub name: [u8; NAME_LEN],
    /// Absolute offset of the file's data record
    pub data_offset: U32,
    /// Unused by the reader (packers write 14)
    pub unknown: u8,
    /// 1-based conflict group, 0 when the name is unique
    pub conflict_index: U16,
}

impl RawTocEntry {
    /// Size on disk.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Header in front of every file's payload.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawFileHeader {
    /// Name again; not guaranteed to match the TOC
    pub name: [u8; NAME_LEN],
    /// Payload length
    pub length: U32,
}

impl RawFileHeader {
    /// Size on disk.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// One member of a conflict group.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawConflictMember {
    /// NUL-padded subdirectory path
    pub subdirectory: [u8; SUBDIR_LEN],
    /// TOC position of the entry living in that subdirectory
    pub toc_index: U16,
}

impl RawConflictMember {
    /// Size on disk.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

//! Header and table of contents parsing.
//!
//! The TOC lists files in lookup-bucket order, which is not the order their
//! data records appear in. [`Toc::into_physical_order`] sorts entries by data
//! offset to recover the on-disk layout; the gap between the end of the TOC
//! and the first data record is where the conflict table lives.

use std::borrow::Cow;

use lgp_common::{text_field, ByteCursor, FromBytes};
use tracing::debug;

use crate::format::{RawArchiveHeader, RawTocEntry};
use crate::{ReadOptions, TocError};

/// Parsed archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArchiveHeader {
    /// Opaque 12-byte creator tag.
    pub creator: [u8; 12],
    /// Declared number of files.
    pub file_count: u32,
}

impl ArchiveHeader {
    /// Creator tag with NUL padding removed, for display.
    pub fn creator_text(&self) -> Cow<'_, str> {
        let start = self
            .creator
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(self.creator.len());
        text_field(&self.creator[start..])
    }

    /// Byte offset where the TOC ends.
    #[inline]
    pub fn toc_end(&self) -> usize {
        RawArchiveHeader::SIZE + self.file_count as usize * RawTocEntry::SIZE
    }
}

/// One table of contents record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TocEntry {
    /// File name, NUL padding stripped.
    pub name: String,
    /// Absolute offset of the file's data record.
    pub data_offset: u32,
    /// Unused byte, kept for inspection.
    pub unknown: u8,
    /// 1-based conflict group, 0 for unique names.
    pub conflict_index: u16,
    /// Position of this record in the TOC.
    pub toc_index: usize,
}

impl TocEntry {
    fn from_raw(raw: &RawTocEntry, toc_index: usize) -> Self {
        Self {
            name: text_field(&raw.name).into_owned(),
            data_offset: raw.data_offset.get(),
            unknown: raw.unknown,
            conflict_index: raw.conflict_index.get(),
            toc_index,
        }
    }

    /// Whether this entry's name collides with another entry.
    #[inline]
    pub fn has_conflict(&self) -> bool {
        self.conflict_index != 0
    }
}

/// Decoded table of contents, in TOC order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    pub header: ArchiveHeader,
    pub entries: Vec<TocEntry>,
    pub has_conflicts: bool,
}

impl Toc {
    /// Parse the header and every TOC record.
    ///
    /// The declared file count is checked against the buffer before anything
    /// is allocated for it.
    pub fn parse(data: &[u8], options: &ReadOptions) -> Result<Self, TocError> {
        let header = parse_header(data)?;

        let cursor = ByteCursor::new_at(data, RawArchiveHeader::SIZE);
        let needed = u64::from(header.file_count) * RawTocEntry::SIZE as u64;
        let truncated = || TocError::EntriesTruncated {
            expected: header.file_count,
            needed,
            available: cursor.remaining(),
        };
        let toc_len = usize::try_from(needed).map_err(|_| truncated())?;
        let toc_bytes = cursor.peek(toc_len).map_err(|_| truncated())?;
        let records = <[RawTocEntry]>::ref_from_bytes(toc_bytes).map_err(|_| truncated())?;

        let (entries, has_conflicts) = decode_records(records, options);

        debug!(
            creator = %header.creator_text(),
            entries = entries.len(),
            has_conflicts,
            "parsed table of contents"
        );

        Ok(Self {
            header,
            entries,
            has_conflicts,
        })
    }

    /// Byte offset where the TOC ends.
    #[inline]
    pub fn end(&self) -> usize {
        self.header.toc_end()
    }

    /// Sort entries by data offset.
    ///
    /// Offsets must be unique and must not point into the header or TOC.
    pub fn into_physical_order(self) -> Result<Vec<TocEntry>, TocError> {
        let toc_end = self.end();
        let mut entries = self.entries;
        entries.sort_unstable_by_key(|e| e.data_offset);

        if let Some(pair) = entries
            .windows(2)
            .find(|pair| pair[0].data_offset == pair[1].data_offset)
        {
            let (a, b) = (pair[0].toc_index, pair[1].toc_index);
            return Err(TocError::DuplicateOffset {
                offset: pair[0].data_offset,
                first: a.min(b),
                second: a.max(b),
            });
        }

        if let Some(first) = entries.first() {
            if (first.data_offset as usize) < toc_end {
                return Err(TocError::OffsetInsideToc {
                    name: first.name.clone(),
                    offset: first.data_offset,
                    toc_end,
                });
            }
        }

        Ok(entries)
    }
}

/// Parse the fixed 16-byte header.
pub fn parse_header(data: &[u8]) -> Result<ArchiveHeader, TocError> {
    let raw: RawArchiveHeader = ByteCursor::new(data)
        .read_struct()
        .map_err(|_| TocError::HeaderTruncated {
            available: data.len(),
        })?;

    Ok(ArchiveHeader {
        creator: raw.creator,
        file_count: raw.file_count.get(),
    })
}

/// Decode one run of records. `first_index` is the TOC position of `records[0]`.
fn decode_chunk(records: &[RawTocEntry], first_index: usize) -> (Vec<TocEntry>, bool) {
    let mut has_conflicts = false;
    let entries = records
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let entry = TocEntry::from_raw(raw, first_index + i);
            has_conflicts |= entry.has_conflict();
            entry
        })
        .collect();
    (entries, has_conflicts)
}

fn merge_chunks(parts: Vec<(Vec<TocEntry>, bool)>, total: usize) -> (Vec<TocEntry>, bool) {
    let mut entries = Vec::with_capacity(total);
    let mut has_conflicts = false;
    for (chunk, conflicts) in parts {
        entries.extend(chunk);
        has_conflicts |= conflicts;
    }
    (entries, has_conflicts)
}

/// Decode all records on the calling thread.
fn decode_sequential(records: &[RawTocEntry], chunk: usize) -> (Vec<TocEntry>, bool) {
    let parts = records
        .chunks(chunk)
        .enumerate()
        .map(|(i, c)| decode_chunk(c, i * chunk))
        .collect();
    merge_chunks(parts, records.len())
}

/// Decode all records, split into chunks of `options.chunk_entries`.
///
/// Tables of at least `options.parallel_threshold` entries are spread over
/// the rayon pool; chunk results are merged in TOC order either way.
#[cfg(feature = "parallel")]
fn decode_records(records: &[RawTocEntry], options: &ReadOptions) -> (Vec<TocEntry>, bool) {
    use rayon::prelude::*;

    let chunk = options.chunk_entries.max(1);
    if records.len() < options.parallel_threshold {
        return decode_sequential(records, chunk);
    }

    let parts: Vec<_> = records
        .par_chunks(chunk)
        .enumerate()
        .map(|(i, c)| decode_chunk(c, i * chunk))
        .collect();
    merge_chunks(parts, records.len())
}

#[cfg(not(feature = "parallel"))]
fn decode_records(records: &[RawTocEntry], options: &ReadOptions) -> (Vec<TocEntry>, bool) {
    decode_sequential(records, options.chunk_entries.max(1))
}

//! Resolved archive index.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;

use lgp_common::{text_field, ByteCursor, Fingerprint, FromBytes};
use tracing::{debug, warn};

use crate::conflict::ConflictTable;
use crate::format::RawFileHeader;
use crate::toc::{ArchiveHeader, Toc};
use crate::{ConflictTableError, Error, ReadOptions, Result};

/// An archive entry with borrowed name and subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef<'a> {
    /// File name from the TOC
    pub name: &'a str,
    /// Absolute offset of the data record
    pub data_offset: u32,
    /// Position in the TOC
    pub toc_index: usize,
    /// 1-based conflict group, 0 for unique names
    pub conflict_index: u16,
    /// Resolved subdirectory, `None` for the archive root
    pub subdirectory: Option<&'a str>,
    /// The entry has a conflict group the conflict table does not cover
    pub unresolved_conflict: bool,
}

impl EntryRef<'_> {
    /// `/`-separated path relative to the extraction root.
    pub fn relative_path(&self) -> String {
        match self.subdirectory {
            Some(dir) => format!("{}/{}", dir, self.name),
            None => self.name.to_string(),
        }
    }
}

/// A decoded data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord<'a> {
    /// Name stored in front of the payload. Informational only.
    pub stored_name: Cow<'a, str>,
    /// Declared payload length
    pub length: u32,
    /// Payload bytes, borrowed from the archive
    pub payload: &'a [u8],
}

/// Compact entry storage.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedEntry {
    name: String,
    data_offset: u32,
    toc_index: usize,
    conflict_index: u16,
    subdirectory: Option<String>,
    unresolved_conflict: bool,
}

/// A fully parsed archive: entries in physical order, resolved subdirectories,
/// and the raw bytes they point into.
///
/// Built all-or-nothing; a structural error anywhere yields no index.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveIndex {
    key: String,
    header: ArchiveHeader,
    entries: Vec<IndexedEntry>,
    conflicts: Option<ConflictTable>,
    fingerprint: Fingerprint,
    data: Vec<u8>,
}

impl ArchiveIndex {
    /// Read and parse an archive file, without caching.
    pub fn open<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = read_limited(path, options)?;
        Self::parse(path.to_string_lossy(), data, options)
    }

    /// Parse an archive held in memory, without caching.
    pub fn parse(key: impl Into<String>, data: Vec<u8>, options: &ReadOptions) -> Result<Self> {
        let fingerprint = Fingerprint::of(&data);
        Self::parse_with_fingerprint(key.into(), data, fingerprint, options)
    }

    pub(crate) fn parse_with_fingerprint(
        key: String,
        data: Vec<u8>,
        fingerprint: Fingerprint,
        options: &ReadOptions,
    ) -> Result<Self> {
        let size = data.len() as u64;
        if size > options.max_archive_size {
            return Err(Error::ArchiveTooLarge {
                size,
                limit: options.max_archive_size,
            });
        }

        let toc = Toc::parse(&data, options)?;
        let header = toc.header;
        let toc_end = toc.end();
        let has_conflicts = toc.has_conflicts;
        let ordered = toc.into_physical_order()?;

        let conflicts = match ordered.first() {
            Some(first) if has_conflicts => {
                let first_offset = first.data_offset as usize;
                if first_offset > data.len() {
                    return Err(ConflictTableError::RegionTruncated {
                        needed: first_offset - toc_end,
                        available: data.len() - toc_end,
                    }
                    .into());
                }
                Some(ConflictTable::parse(&data[toc_end..first_offset])?)
            }
            _ => None,
        };

        let entries: Vec<IndexedEntry> = ordered
            .into_iter()
            .map(|entry| {
                let resolved = if entry.has_conflict() {
                    conflicts
                        .as_ref()
                        .and_then(|table| table.resolve(entry.conflict_index, entry.toc_index))
                } else {
                    Some("")
                };
                let unresolved_conflict = resolved.is_none();
                if unresolved_conflict {
                    warn!(
                        name = %entry.name,
                        toc_index = entry.toc_index,
                        conflict_index = entry.conflict_index,
                        "unresolved conflict, entry will not be extracted"
                    );
                }
                let subdirectory = resolved.filter(|dir| !dir.is_empty()).map(str::to_string);

                IndexedEntry {
                    name: entry.name,
                    data_offset: entry.data_offset,
                    toc_index: entry.toc_index,
                    conflict_index: entry.conflict_index,
                    subdirectory,
                    unresolved_conflict,
                }
            })
            .collect();

        debug!(
            key = %key,
            entries = entries.len(),
            conflict_members = conflicts.as_ref().map_or(0, ConflictTable::len),
            fingerprint = ?fingerprint,
            "archive indexed"
        );

        Ok(Self {
            key,
            header,
            entries,
            conflicts,
            fingerprint,
            data,
        })
    }

    /// Cache key or logical name this index was built under.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Opaque creator tag.
    #[inline]
    pub fn creator(&self) -> &[u8; 12] {
        &self.header.creator
    }

    /// Conflict table, present only when some entry has a conflict.
    #[inline]
    pub fn conflicts(&self) -> Option<&ConflictTable> {
        self.conflicts.as_ref()
    }

    /// SHA-512 of the raw archive bytes.
    #[inline]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Raw archive bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in physical (data offset) order.
    ///
    /// Each call starts a fresh pass.
    #[inline]
    pub fn entries(&self) -> impl ExactSizeIterator<Item = EntryRef<'_>> + '_ {
        self.entries.iter().map(Self::entry_ref)
    }

    /// Get entry by physical position.
    #[inline]
    pub fn get(&self, index: usize) -> Option<EntryRef<'_>> {
        self.entries.get(index).map(Self::entry_ref)
    }

    /// Find the first entry with a name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<EntryRef<'_>> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(Self::entry_ref)
    }

    /// Decode the data record of an entry.
    pub fn file_record(&self, entry: &EntryRef<'_>) -> Result<FileRecord<'_>> {
        let offset = entry.data_offset as usize;
        let mut cursor = ByteCursor::new_at(&self.data, offset);
        let truncated = |needed: u64, available: usize| Error::TruncatedPayload {
            name: entry.name.to_string(),
            offset: entry.data_offset,
            needed,
            available: available as u64,
        };

        // Borrowed from `self.data` so the stored name can be handed out.
        let header = cursor
            .take(RawFileHeader::SIZE)
            .ok()
            .and_then(|bytes| RawFileHeader::ref_from_bytes(bytes).ok())
            .ok_or_else(|| truncated(RawFileHeader::SIZE as u64, cursor.remaining()))?;
        let length = header.length.get();
        let payload = cursor
            .take(length as usize)
            .map_err(|_| truncated(u64::from(length), cursor.remaining()))?;

        Ok(FileRecord {
            stored_name: text_field(&header.name),
            length,
            payload,
        })
    }

    /// Read an entry's payload into an owned buffer.
    pub fn read(&self, entry: &EntryRef<'_>) -> Result<Vec<u8>> {
        self.file_record(entry).map(|record| record.payload.to_vec())
    }

    #[inline]
    fn entry_ref(entry: &IndexedEntry) -> EntryRef<'_> {
        EntryRef {
            name: &entry.name,
            data_offset: entry.data_offset,
            toc_index: entry.toc_index,
            conflict_index: entry.conflict_index,
            subdirectory: entry.subdirectory.as_deref(),
            unresolved_conflict: entry.unresolved_conflict,
        }
    }
}

/// Read a file after checking its size against the configured limit.
pub(crate) fn read_limited(path: &Path, options: &ReadOptions) -> Result<Vec<u8>> {
    let size = fs::metadata(path)?.len();
    if size > options.max_archive_size {
        return Err(Error::ArchiveTooLarge {
            size,
            limit: options.max_archive_size,
        });
    }
    Ok(fs::read(path)?)
}

impl fmt::Debug for ArchiveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveIndex")
            .field("key", &self.key)
            .field("creator", &self.header.creator_text())
            .field("entries", &self.entries.len())
            .field("conflicts", &self.conflicts.as_ref().map(ConflictTable::len))
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

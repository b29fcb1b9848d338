//! Error types for the LGP archive crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or extracting LGP archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the source archive or the destination root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive is bigger than the configured limit.
    #[error("archive is {size} bytes, larger than the {limit} byte limit")]
    ArchiveTooLarge { size: u64, limit: u64 },

    /// Header or table of contents violates the layout.
    #[error("malformed table of contents: {0}")]
    MalformedToc(#[from] TocError),

    /// Conflict table violates the layout.
    #[error("malformed conflict table: {0}")]
    MalformedConflictTable(#[from] ConflictTableError),

    /// An entry's data record runs past the end of the archive.
    #[error(
        "truncated payload for {name} at offset {offset}: needed {needed} bytes but only {available} available"
    )]
    TruncatedPayload {
        name: String,
        offset: u32,
        needed: u64,
        available: u64,
    },

    /// Output subdirectory could not be created.
    #[error("could not create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be written.
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry would be written outside the destination root.
    #[error("refusing to extract to unsafe path: {path}")]
    UnsafePath { path: String },

    /// Entry has a conflict group but the conflict table names no subdirectory for it.
    #[error("unresolved conflict for {name} (conflict group {conflict_index})")]
    UnresolvedConflict { name: String, conflict_index: u16 },

    /// An earlier entry already extracts to the same path.
    #[error("{path} is already written by an earlier entry")]
    DuplicatePath { path: String },
}

/// Structural problems in the header and table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TocError {
    /// Fewer than 16 bytes for creator tag and file count.
    #[error("archive header needs 16 bytes, only {available} available")]
    HeaderTruncated { available: usize },

    /// File count does not fit in the rest of the buffer.
    #[error("expected {expected} TOC entries ({needed} bytes), only {available} bytes available")]
    EntriesTruncated {
        expected: u32,
        needed: u64,
        available: usize,
    },

    /// Two entries claim the same data record.
    #[error("entries {first} and {second} share data offset {offset}")]
    DuplicateOffset {
        offset: u32,
        first: usize,
        second: usize,
    },

    /// A data offset points back into the header or table of contents.
    #[error("entry {name} has data offset {offset} inside the table of contents (ends at {toc_end})")]
    OffsetInsideToc {
        name: String,
        offset: u32,
        toc_end: usize,
    },
}

/// Structural problems in the conflict table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictTableError {
    /// Region cannot even hold the group count.
    #[error("conflict region is {available} bytes, needs at least {needed}")]
    RegionTruncated { needed: usize, available: usize },

    /// No lookup prefix length makes the declared table end exactly at the first file.
    #[error(
        "no conflict table fits the {region_len} byte region (at the usual {typical_prefix} byte prefix: {detail})"
    )]
    NoExactFit {
        region_len: usize,
        typical_prefix: usize,
        detail: String,
    },

    /// The derived-prefix search gave up before finding a fit.
    #[error("no conflict table found in the {region_len} byte region within {steps} parse steps")]
    SearchExhausted { region_len: usize, steps: usize },
}

/// Result type for LGP archive operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error only affects a single entry during extraction.
    pub fn is_per_entry(&self) -> bool {
        matches!(
            self,
            Error::TruncatedPayload { .. }
                | Error::DirectoryCreation { .. }
                | Error::Write { .. }
                | Error::UnsafePath { .. }
                | Error::UnresolvedConflict { .. }
                | Error::DuplicatePath { .. }
        )
    }
}

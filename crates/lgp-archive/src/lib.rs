//! LGP archive reader for Final Fantasy VII game files.
//!
//! An LGP archive is a flat little-endian container:
//!
//! - 12-byte creator tag and a `u32` file count
//! - table of contents, 27 bytes per entry
//! - a lookup table followed by a conflict table, present when several
//!   entries share a name and live in different subdirectories
//! - data records, each a 20-byte name, a `u32` length and the payload
//!
//! Parsing is all-or-nothing and produces an [`ArchiveIndex`] whose entries
//! are listed in physical (data offset) order. An [`ArchiveCache`] keeps one
//! index per key and only re-parses when the file's SHA-512 changes.
//!
//! # Example
//!
//! ```no_run
//! use lgp_archive::{extract_archive, read_archive, ArchiveCache};
//!
//! let cache = ArchiveCache::new();
//! let archive = read_archive("char.lgp", &cache)?;
//!
//! for entry in archive.entries() {
//!     println!("{} @ {}", entry.relative_path(), entry.data_offset);
//! }
//!
//! let report = extract_archive(&archive, "out/char")?;
//! for (path, error) in &report.failed {
//!     eprintln!("{path}: {error}");
//! }
//! # Ok::<(), lgp_archive::Error>(())
//! ```

mod cache;
mod conflict;
mod error;
mod extract;
mod index;
mod options;
mod toc;
pub mod format;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod testutil;

pub use cache::{read_archive, ArchiveCache, CacheStats};
pub use conflict::{ConflictEntry, ConflictTable};
pub use error::{ConflictTableError, Error, Result, TocError};
pub use extract::{extract_archive, extract_entry, output_path, ExtractionReport};
pub use index::{ArchiveIndex, EntryRef, FileRecord};
pub use options::ReadOptions;
pub use toc::{parse_header, ArchiveHeader, Toc, TocEntry};

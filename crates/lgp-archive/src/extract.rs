//! Extraction of archive entries to disk.
//!
//! Every entry is written to `destination/subdirectory/name`. Failures are
//! per entry: a truncated record or an unwritable path is recorded in the
//! [`ExtractionReport`] and the remaining entries are still attempted. Only a
//! destination root that cannot be created aborts the whole call.
//!
//! Output paths are claimed in physical order before anything is written, so
//! concurrent writes never target the same file. An entry whose path is
//! already claimed, or whose conflict could not be resolved, fails instead.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::{ArchiveIndex, EntryRef, Error, Result};

/// Outcome of extracting an archive.
///
/// Entries are named by their `/`-separated path relative to the destination
/// and listed in physical order.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl ExtractionReport {
    /// True when every entry was written.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of entries attempted.
    #[inline]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Extract every entry of `index` below `destination`.
///
/// Existing files are overwritten. Intermediate directories are created as
/// needed; directories that already exist are fine.
pub fn extract_archive<P: AsRef<Path>>(
    index: &ArchiveIndex,
    destination: P,
) -> Result<ExtractionReport> {
    let root = destination.as_ref();
    fs::create_dir_all(root)?;

    let entries: Vec<EntryRef<'_>> = index.entries().collect();
    let blocked = claim_paths(&entries);
    let outcomes = run_all(index, root, &entries, blocked);

    let mut report = ExtractionReport::default();
    for (entry, outcome) in entries.iter().zip(outcomes) {
        let relative = entry.relative_path();
        match outcome {
            Ok(()) => report.succeeded.push(relative),
            Err(e) => {
                warn!(entry = %relative, error = %e, "failed to extract entry");
                report.failed.push((relative, e));
            }
        }
    }

    info!(
        archive = %index.key(),
        destination = %root.display(),
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "extraction finished"
    );

    Ok(report)
}

/// Reject entries that cannot be given a path of their own.
///
/// Returns one slot per entry; `Some` holds the reason it is skipped.
fn claim_paths(entries: &[EntryRef<'_>]) -> Vec<Option<Error>> {
    let mut claimed = HashSet::with_capacity(entries.len());
    entries
        .iter()
        .map(|entry| {
            if entry.unresolved_conflict {
                return Some(Error::UnresolvedConflict {
                    name: entry.name.to_string(),
                    conflict_index: entry.conflict_index,
                });
            }
            let path = entry.relative_path();
            if claimed.contains(&path) {
                Some(Error::DuplicatePath { path })
            } else {
                claimed.insert(path);
                None
            }
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn run_all(
    index: &ArchiveIndex,
    root: &Path,
    entries: &[EntryRef<'_>],
    blocked: Vec<Option<Error>>,
) -> Vec<Result<()>> {
    use rayon::prelude::*;

    entries
        .par_iter()
        .zip(blocked)
        .map(|(entry, blocked)| match blocked {
            Some(e) => Err(e),
            None => extract_entry(index, root, entry),
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_all(
    index: &ArchiveIndex,
    root: &Path,
    entries: &[EntryRef<'_>],
    blocked: Vec<Option<Error>>,
) -> Vec<Result<()>> {
    entries
        .iter()
        .zip(blocked)
        .map(|(entry, blocked)| match blocked {
            Some(e) => Err(e),
            None => extract_entry(index, root, entry),
        })
        .collect()
}

/// Write a single entry below `root`.
pub fn extract_entry(index: &ArchiveIndex, root: &Path, entry: &EntryRef<'_>) -> Result<()> {
    let target = output_path(root, entry)?;
    let record = index.file_record(entry)?;

    if let Some(parent) = target.parent() {
        if parent != root {
            fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreation {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(&target, record.payload).map_err(|source| Error::Write {
        path: target.clone(),
        source,
    })
}

/// Destination path of an entry.
///
/// Every component of the subdirectory and the name must be a plain file
/// name; anything that could climb out of `root` is rejected.
pub fn output_path(root: &Path, entry: &EntryRef<'_>) -> Result<PathBuf> {
    let unsafe_path = || Error::UnsafePath {
        path: entry.relative_path(),
    };

    let mut path = root.to_path_buf();
    let parts = entry
        .subdirectory
        .into_iter()
        .flat_map(|dir| dir.split('/'))
        .filter(|part| !part.is_empty())
        .chain(std::iter::once(entry.name));

    for part in parts {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !part.contains('\\') => path.push(name),
            _ => return Err(unsafe_path()),
        }
    }

    Ok(path)
}

//! Fingerprint-validated archive cache.
//!
//! Parsing a large archive is slow, and callers tend to open the same file
//! many times. [`ArchiveCache`] remembers the last index built for each key
//! together with the SHA-512 of the bytes it came from; a read whose bytes
//! hash the same gets the remembered index back without parsing.
//!
//! Each key has its own slot lock, held while that key is being parsed, so
//! concurrent reads of one archive parse it once and the rest wait for the
//! result. Different keys never wait on each other.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lgp_common::Fingerprint;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::index::read_limited;
use crate::{ArchiveIndex, ReadOptions, Result};

#[derive(Default)]
struct Slot {
    current: Mutex<Option<Arc<ArchiveIndex>>>,
}

/// Cache hit and parse counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from the cache.
    pub hits: usize,
    /// Reads that ran the parser.
    pub parses: usize,
    /// Keys currently held.
    pub entries: usize,
}

/// Archive cache keyed by path or logical name.
///
/// Entries live as long as the cache; there is no eviction. Create one at
/// startup and pass it by reference to every read.
pub struct ArchiveCache {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    options: ReadOptions,
    hits: AtomicUsize,
    parses: AtomicUsize,
}

impl ArchiveCache {
    /// Create an empty cache with default read options.
    pub fn new() -> Self {
        Self::with_options(ReadOptions::default())
    }

    /// Create an empty cache with custom read options.
    pub fn with_options(options: ReadOptions) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            options,
            hits: AtomicUsize::new(0),
            parses: AtomicUsize::new(0),
        }
    }

    /// Read options used for every parse.
    #[inline]
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Read and index an archive file.
    ///
    /// The size limit is checked against file metadata before reading.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Arc<ArchiveIndex>> {
        let path = path.as_ref();
        let data = read_limited(path, &self.options)?;
        self.read_bytes(path.to_string_lossy(), data)
    }

    /// Index an archive already in memory under `key`.
    pub fn read_bytes(&self, key: impl Into<String>, data: Vec<u8>) -> Result<Arc<ArchiveIndex>> {
        let key = key.into();
        let fingerprint = Fingerprint::of(&data);
        let slot = self.slot(&key);

        // Held for the whole parse: concurrent readers of this key queue here.
        let mut current = slot.current.lock();
        if let Some(index) = current.as_ref() {
            if index.fingerprint() == &fingerprint {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "archive cache hit");
                return Ok(Arc::clone(index));
            }
            debug!(key = %key, "archive contents changed, re-parsing");
        }

        self.parses.fetch_add(1, Ordering::Relaxed);
        match ArchiveIndex::parse_with_fingerprint(key, data, fingerprint, &self.options) {
            Ok(index) => {
                let index = Arc::new(index);
                *current = Some(Arc::clone(&index));
                Ok(index)
            }
            Err(e) => {
                // The old index no longer describes this key's contents.
                *current = None;
                Err(e)
            }
        }
    }

    /// Cached index for a key, if any, without touching the file.
    pub fn get(&self, key: &str) -> Option<Arc<ArchiveIndex>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let current = slot.current.lock();
        current.clone()
    }

    /// Number of times the parser has run.
    #[inline]
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            parses: self.parse_count(),
            entries: self.slots.lock().len(),
        }
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.to_string()).or_default())
    }
}

impl Default for ArchiveCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArchiveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveCache")
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Read an archive through a cache with the cache's options.
pub fn read_archive<P: AsRef<Path>>(path: P, cache: &ArchiveCache) -> Result<Arc<ArchiveIndex>> {
    cache.read(path)
}

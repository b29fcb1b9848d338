//! Reader configuration.

/// Limits and tuning knobs for reading an archive.
///
/// ```
/// use lgp_archive::ReadOptions;
///
/// let options = ReadOptions::default()
///     .with_max_archive_size(64 * 1024 * 1024)
///     .with_parallel_threshold(1024);
/// assert_eq!(options.max_archive_size, 64 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Archives larger than this are rejected before any bytes are read.
    pub max_archive_size: u64,
    /// Minimum TOC entry count before parsing is split across workers.
    pub parallel_threshold: usize,
    /// TOC entries handed to each worker.
    pub chunk_entries: usize,
}

impl ReadOptions {
    /// Default size limit, 2 GiB. The format stores offsets as u32.
    pub const DEFAULT_MAX_ARCHIVE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

    /// Set the archive size limit.
    pub fn with_max_archive_size(mut self, bytes: u64) -> Self {
        self.max_archive_size = bytes;
        self
    }

    /// Set the entry count at which TOC parsing goes parallel.
    pub fn with_parallel_threshold(mut self, entries: usize) -> Self {
        self.parallel_threshold = entries;
        self
    }

    /// Set the number of TOC entries per worker chunk. Zero is treated as one.
    pub fn with_chunk_entries(mut self, entries: usize) -> Self {
        self.chunk_entries = entries.max(1);
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_archive_size: Self::DEFAULT_MAX_ARCHIVE_SIZE,
            parallel_threshold: 4096,
            chunk_entries: 1024,
        }
    }
}

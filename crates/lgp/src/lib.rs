//! LGP - Final Fantasy VII archive reading and extraction library.
//!
//! This crate provides a unified interface to the LGP crates.
//!
//! # Crates
//!
//! - [`lgp_common`] - Common utilities (byte cursor, SHA-512 fingerprints)
//! - [`lgp_archive`] - LGP archive parsing, caching and extraction
//!
//! # Example
//!
//! ```no_run
//! use lgp::prelude::*;
//!
//! let cache = ArchiveCache::new();
//! let archive = read_archive("magic.lgp", &cache)?;
//!
//! if let Some(entry) = archive.find("fire.tex") {
//!     let data = archive.read(&entry)?;
//!     println!("{}: {} bytes", entry.relative_path(), data.len());
//! }
//!
//! let report = extract_archive(&archive, "out/magic")?;
//! println!("{} extracted, {} failed", report.succeeded.len(), report.failed.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use lgp_archive as archive;
pub use lgp_common as common;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use lgp_archive::{
        extract_archive, read_archive, ArchiveCache, ArchiveIndex, EntryRef, ExtractionReport,
        ReadOptions,
    };
    pub use lgp_common::{ByteCursor, Fingerprint};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Common utilities for LGP archives.
//!
//! This crate provides the foundational pieces used by the archive reader:
//!
//! - [`ByteCursor`] - Zero-copy sequential reads from byte slices
//! - [`Fingerprint`] - SHA-512 content digests for cache validation
//! - [`text_field`] - NUL-padded text field decoding

mod digest;
mod error;
mod reader;

pub use digest::Fingerprint;
pub use error::{Error, Result};
pub use reader::{text_field, ByteCursor};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

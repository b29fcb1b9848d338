//! Error types for lgp-common.

use thiserror::Error;

/// Common error type for low-level reads.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("truncated input: needed {needed} bytes but only {available} available")]
    TruncatedInput { needed: usize, available: usize },

    /// Integer width outside of 1, 2, 4 or 8 bytes.
    #[error("unsupported integer width: {0} bytes")]
    UnsupportedWidth(usize),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

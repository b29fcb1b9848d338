//! Content fingerprints.
//!
//! Archives are identified by the SHA-512 of their full contents, so a file
//! that was rewritten in place is never mistaken for the one parsed before.

use std::fmt;

use sha2::{Digest, Sha512};

/// SHA-512 digest of an archive's raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 64]);

impl Fingerprint {
    /// Compute the fingerprint of a byte slice.
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha512::digest(data);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw digest bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex form of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first eight bytes are plenty to tell digests apart in logs.
        write!(f, "Fingerprint({}..)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

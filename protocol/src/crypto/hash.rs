//! # Content Hashing
//!
//! The substrate commits to every stored value by its SHA-256 digest. Two
//! organizations prove they hold the same private value by comparing these
//! digests, so the hash must be taken over the exact stored bytes. Never
//! hash a re-serialized form of a value you intend to compare.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use cloister_protocol::crypto::sha256;
///
/// let hash = sha256(b"asset1");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; HASH_OUTPUT_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// A fixed-length content digest as returned by `getHash`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ContentHash(pub [u8; HASH_OUTPUT_LENGTH]);

impl ContentHash {
    /// Hash raw stored bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(sha256(data))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight hex characters. Enough to correlate log lines without
    /// printing whole digests.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc") from FIPS 180-2.
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn content_hash_is_byte_sensitive() {
        let a = ContentHash::of(br#"{"id":"asset1","appraisedValue":100}"#);
        let b = ContentHash::of(br#"{"appraisedValue":100,"id":"asset1"}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn short_is_prefix_of_hex() {
        let h = ContentHash::of(b"x");
        assert!(h.to_hex().starts_with(&h.short()));
        assert_eq!(h.short().len(), 8);
    }
}

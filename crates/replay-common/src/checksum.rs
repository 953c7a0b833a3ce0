//! Content hashing for replay deduplication
//!
//! Replays are deduplicated on the SHA-256 digest of their canonical payload
//! string (the serialized `statsJson` value), never on the raw artifact bytes.
//! Two artifacts that differ only in surrounding noise therefore hash equally.

use crate::error::{ReplayCommonError, Result};
use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of a canonical payload string
pub fn content_hash(canonical: &str) -> String {
    digest_hex(canonical.as_bytes())
}

/// Compute the lowercase hex SHA-256 digest of a byte slice
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Verify that a canonical payload hashes to the expected digest
pub fn verify_content_hash(canonical: &str, expected: &str) -> Result<()> {
    let actual = content_hash(canonical);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ReplayCommonError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

//! SHA256 digest utilities
//!
//! Blobs are addressed by `sha256:<hex>` digests. Content read back from the local
//! cache is verified against its digest before it leaves the machine.

use crate::error::{RegistryError, Result};
use sha2::{Digest, Sha256};

pub const SHA256_PREFIX: &str = "sha256:";

/// Utilities for working with SHA256 digests
pub struct DigestUtils;

impl DigestUtils {
    /// Hex encoded SHA256 of `data`
    pub fn compute_sha256(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Full digest (with `sha256:` prefix) of `data`
    pub fn compute_docker_digest(data: &[u8]) -> String {
        format!("{}{}", SHA256_PREFIX, Self::compute_sha256(data))
    }

    /// Validate SHA256 hex string (64 characters, all lowercase hex)
    pub fn is_valid_sha256_hex(hex: &str) -> bool {
        hex.len() == 64 && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    pub fn is_valid_docker_digest(digest: &str) -> bool {
        digest
            .strip_prefix(SHA256_PREFIX)
            .is_some_and(Self::is_valid_sha256_hex)
    }

    /// Normalize to `sha256:<hex>`, accepting a bare hex string
    pub fn normalize_digest(digest: &str) -> Result<String> {
        let hex = digest.strip_prefix(SHA256_PREFIX).unwrap_or(digest);
        if !Self::is_valid_sha256_hex(hex) {
            return Err(RegistryError::Validation(format!(
                "Invalid SHA256 digest: {}",
                digest
            )));
        }
        Ok(format!("{}{}", SHA256_PREFIX, hex))
    }

    /// Verify that `data` hashes to `expected`
    pub fn verify(data: &[u8], expected: &str) -> Result<()> {
        let actual = Self::compute_docker_digest(data);
        if actual == expected {
            Ok(())
        } else {
            Err(RegistryError::DigestMismatch {
                expected: expected.to_string(),
                actual,
            })
        }
    }
}

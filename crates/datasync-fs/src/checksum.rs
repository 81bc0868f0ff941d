//! SHA-256 content fingerprints
//!
//! Used to decide whether a mirror copy would change anything, so repeated
//! reconciliation passes leave unchanged files (and their mtimes) alone.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{Error, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the checksum of an in-memory buffer.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_bytes_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the checksum of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(compute_bytes_checksum(&content))
}

/// Whether both files exist and hold identical bytes.
///
/// A missing or unreadable file on either side counts as "different".
pub fn files_match(a: &Path, b: &Path) -> bool {
    match (compute_file_checksum(a), compute_file_checksum(b)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

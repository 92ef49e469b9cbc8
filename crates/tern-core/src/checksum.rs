//! SHA-256 checksums for detecting edited migration scripts.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 checksum of a script as lowercase hex.
///
/// Line endings are normalized and trailing whitespace is ignored, so saving a
/// file on another platform does not count as an edit.
pub fn compute_checksum(script: &str) -> String {
    let normalized = script.replace("\r\n", "\n");
    let mut hasher = Sha256::new();
    hasher.update(normalized.trim_end().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First 12 hex characters of [`compute_checksum`], for display.
pub fn short_checksum(script: &str) -> String {
    let mut checksum = compute_checksum(script);
    checksum.truncate(12);
    checksum
}

/// Whether the current script differs from the one recorded in the ledger.
pub fn has_drifted(recorded: &str, current: &str) -> bool {
    compute_checksum(recorded) != compute_checksum(current)
}

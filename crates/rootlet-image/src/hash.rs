//! SHA-256 content verification.
//!
//! Validates integrity of downloaded and cached layer blobs against their
//! `sha256:` digests.

use std::io::Read;
use std::path::Path;

use rootlet_common::error::{Result, RootletError};
use rootlet_common::types::Digest;
use sha2::{Digest as _, Sha256};

/// Returns the lowercase hex encoding of a finished hasher.
#[must_use]
pub fn finish_hex(hasher: Sha256) -> String {
    hex::encode(hasher.finalize())
}

/// Computes the SHA-256 hash of a file as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e| RootletError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(finish_hex(hasher))
}

/// Checks a computed hex hash against the expected digest.
///
/// Digests that are not well-formed `sha256:` values cannot be checked and
/// are accepted.
///
/// # Errors
///
/// Returns `RootletError::HashMismatch` if the hashes differ.
pub fn check_digest(expected: &Digest, actual_hex: &str) -> Result<()> {
    let Some(expected_hex) = expected.sha256_hex() else {
        tracing::debug!(digest = %expected, "digest is not sha256, skipping verification");
        return Ok(());
    };
    if expected_hex.eq_ignore_ascii_case(actual_hex) {
        Ok(())
    } else {
        Err(RootletError::HashMismatch {
            resource: expected.to_string(),
            expected: expected_hex.to_string(),
            actual: actual_hex.to_string(),
        })
    }
}

/// Validates that a file matches the expected digest.
///
/// # Errors
///
/// Returns `RootletError::HashMismatch` if the hashes do not match, or an
/// I/O error if the file cannot be read.
pub fn validate_hash(path: &Path, expected: &Digest) -> Result<()> {
    tracing::debug!(path = %path.display(), digest = %expected, "validating SHA-256 hash");
    let actual = hash_file(path)?;
    check_digest(expected, &actual)
}

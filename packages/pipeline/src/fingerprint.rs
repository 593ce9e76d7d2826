//! Snapshot identity via content hashing.
//!
//! A snapshot fingerprint is the hex-encoded SHA-256 over the input files
//! in config order. It stamps every artifact so the frontend can tell a
//! stale payload from a current one, and lets the density cache skip its
//! rewrite when nothing changed.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::PipelineError;

/// Hashes the given files' contents, in order, into one fingerprint.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if a file cannot be opened or read.
pub fn snapshot_fingerprint(paths: &[PathBuf]) -> Result<String, PipelineError> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 1 << 16];

    for path in paths {
        let mut file = File::open(path)?;
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

//! SHA-256 content verification.
//!
//! Validates integrity of downloaded or local layer archives.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use runlet_common::error::{Result, RunletError};
use runlet_common::types::Sha256Hash;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of an in-memory blob.
///
/// # Errors
///
/// Never fails in practice; the `Result` comes from hex validation.
pub fn hash_bytes(data: &[u8]) -> Result<Sha256Hash> {
    Sha256Hash::from_hex(format!("{:x}", Sha256::digest(data)))
}

/// Computes the SHA-256 hash of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e| RunletError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Sha256Hash::from_hex(format!("{:x}", hasher.finalize()))
}

/// Copies `reader` into an anonymous temporary file while hashing it, and
/// returns the file rewound to its start once the digest matches `expected`.
///
/// The file is unlinked from the start, so it disappears with its handle.
///
/// # Errors
///
/// Returns `RunletError::HashMismatch` if the content does not match, or an
/// I/O error if reading the source or writing the spool file fails.
pub fn spool_verified<R: Read>(
    resource: &str,
    mut reader: R,
    expected: &Sha256Hash,
) -> Result<File> {
    let spool_err = |e| RunletError::Io {
        path: std::env::temp_dir(),
        source: e,
    };
    let mut file = tempfile::tempfile().map_err(spool_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).map_err(|e| RunletError::Io {
            path: PathBuf::from(resource),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n]).map_err(spool_err)?;
        total += n as u64;
    }

    let actual = Sha256Hash::from_hex(format!("{:x}", hasher.finalize()))?;
    if actual != *expected {
        return Err(RunletError::HashMismatch {
            resource: resource.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    tracing::debug!(resource, bytes = total, "spooled and verified");

    let _ = file.seek(SeekFrom::Start(0)).map_err(spool_err)?;
    Ok(file)
}

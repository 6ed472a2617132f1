//! SHA-256 content hashing.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use renderhub_core::error::{AppError, ErrorKind};
use renderhub_core::result::AppResult;

const READ_BUFFER: usize = 64 * 1024;

/// Hex-encoded SHA-256 of an in-memory buffer.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hex-encoded SHA-256 of a file, read incrementally.
pub async fn file_hash(path: &Path) -> AppResult<String> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to open {} for hashing", path.display()),
            e,
        )
    })?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare two hex digests, ignoring case.
pub fn hashes_match(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected.trim())
}

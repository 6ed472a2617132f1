//! Durable cache metadata.
//!
//! The metadata set is a JSON array of [`CacheEntry`] records. Writes go to a
//! sibling temp file which is fsynced and renamed over the previous file, so
//! a crash mid-write leaves the last good set in place. Callers serialize
//! writes; this type does no locking of its own.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use renderhub_core::error::{AppError, ErrorKind};
use renderhub_core::result::AppResult;
use renderhub_entity::cache::CacheEntry;

/// JSON file holding the cache's entry set.
#[derive(Debug, Clone)]
pub struct MetadataFile {
    /// Final location of the metadata file.
    path: PathBuf,
}

impl MetadataFile {
    /// Create a handle for the metadata file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the metadata file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted entry set.
    ///
    /// A missing file is an empty set. An unreadable JSON document is moved
    /// aside to `<name>.corrupt` and treated as empty.
    pub async fn load(&self) -> AppResult<Vec<CacheEntry>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache metadata yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read cache metadata: {}", self.path.display()),
                    e,
                ));
            }
        };

        match serde_json::from_slice::<Vec<CacheEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let quarantine = self.sibling("corrupt");
                warn!(
                    path = %self.path.display(),
                    quarantine = %quarantine.display(),
                    error = %e,
                    "Cache metadata is unreadable, starting empty"
                );
                fs::rename(&self.path, &quarantine).await?;
                Ok(Vec::new())
            }
        }
    }

    /// Replace the persisted entry set.
    pub async fn save(&self, entries: &[CacheEntry]) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.sibling("tmp");

        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &self.path).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write cache metadata: {}", self.path.display()),
                e,
            ));
        }

        debug!(path = %self.path.display(), entries = entries.len(), "Persisted cache metadata");
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{suffix}"));
        self.path.with_file_name(name)
    }
}

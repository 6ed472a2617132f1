//! Expiry sweep over the cache metadata set.

use std::time::Instant;

use tokio::fs;
use tracing::{debug, info, warn};

use renderhub_core::result::AppResult;
use renderhub_entity::cache::{CacheEntry, CleanupResult};

use crate::store::CacheStore;

impl CacheStore {
    /// Delete every entry whose expiry has passed.
    ///
    /// File deletion is best effort: a failure is recorded in
    /// [`CleanupResult::failed_deletions`] and the sweep carries on. The
    /// metadata set is rewritten to hold only the remaining entries. An
    /// error is returned only when that rewrite fails.
    pub async fn sweep(&self) -> AppResult<CleanupResult> {
        let started = Instant::now();
        let now = self.clock.now();
        let mut result = CleanupResult::default();

        let mut entries = self.entries.lock().await;
        let (expired, live): (Vec<CacheEntry>, Vec<CacheEntry>) = entries
            .drain(..)
            .partition(|entry| entry.is_sweepable_at(now));
        *entries = live;

        if expired.is_empty() {
            result.duration = started.elapsed();
            debug!(remaining = entries.len(), "Cache sweep found nothing to evict");
            return Ok(result);
        }

        for entry in &expired {
            match fs::remove_file(&entry.storage_path).await {
                Ok(()) => {
                    result.files_deleted += 1;
                    result.space_freed_bytes += entry.size_bytes;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(
                        path = %entry.storage_path.display(),
                        "Expired artifact was already gone"
                    );
                }
                Err(e) => {
                    warn!(
                        path = %entry.storage_path.display(),
                        error = %e,
                        "Failed to delete expired artifact"
                    );
                    result
                        .failed_deletions
                        .push(entry.storage_path.display().to_string());
                }
            }
        }

        let persisted = self.metadata.save(&entries).await;
        let remaining = entries.len();
        drop(entries);
        result.duration = started.elapsed();
        persisted?;

        info!(
            evicted = expired.len(),
            files_deleted = result.files_deleted,
            space_freed_bytes = result.space_freed_bytes,
            failed = result.failed_deletions.len(),
            remaining,
            duration_ms = result.duration.as_millis() as u64,
            "Cache sweep finished"
        );
        Ok(result)
    }
}

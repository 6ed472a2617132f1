//! Result of one cache sweep.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one expiry sweep. Produced fresh per sweep, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    /// Backing files removed.
    pub files_deleted: u64,
    /// Bytes released by the removed files.
    pub space_freed_bytes: u64,
    /// Wall time spent sweeping.
    pub duration: Duration,
    /// Paths whose deletion failed.
    pub failed_deletions: Vec<String>,
}

impl CleanupResult {
    /// A sweep succeeds when every eligible file was deleted.
    pub fn is_success(&self) -> bool {
        self.failed_deletions.is_empty()
    }
}

//! Cache entry model.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use renderhub_core::types::DownloadToken;

/// Metadata for one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Content hash; the deduplication key.
    pub hash: String,
    /// Location of the backing file.
    pub storage_path: PathBuf,
    /// File name offered on download.
    pub original_name: String,
    /// MIME type served on download.
    pub content_type: String,
    /// Size of the backing file.
    pub size_bytes: u64,
    /// When the entry was stored.
    pub created_at: DateTime<Utc>,
    /// When the entry stops being retrievable.
    pub expires_at: DateTime<Utc>,
    /// Capability token for retrieval.
    pub download_token: DownloadToken,
}

impl CacheEntry {
    /// Retrievable strictly before `expires_at`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Eligible for deletion once `now` has passed `expires_at`.
    pub fn is_sweepable_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

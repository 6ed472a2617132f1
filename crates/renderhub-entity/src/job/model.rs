//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use renderhub_core::types::JobId;

/// One unit of queued render work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Payload handed to the renderer.
    pub payload: serde_json::Value,
    /// Free-form tag selecting the rendering strategy.
    pub processing_mode: String,
    /// Content hash the artifact will be cached under, if the caller supplied one.
    pub result_hash: Option<String>,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Key under which the finished artifact is cached.
    ///
    /// Falls back to the job id, so only callers that supply a stable content
    /// hash get cross-request deduplication.
    pub fn cache_key(&self) -> &str {
        self.result_hash.as_deref().unwrap_or(self.id.as_str())
    }
}

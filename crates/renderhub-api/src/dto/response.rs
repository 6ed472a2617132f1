//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use renderhub_cache::CacheStats;
use renderhub_entity::cache::CacheEntry;
use renderhub_entity::job::{JobState, JobStatus};
use renderhub_worker::SchedulerStats;

/// Reply to a job submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    /// Id of the created job. Absent on a cache hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// `Queued` for new jobs, `Completed` on a cache hit.
    pub status: JobState,
    /// Whether an existing artifact answered the request.
    pub cached: bool,
    /// Token of the cached artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_token: Option<String>,
    /// Download URL of the cached artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Reply to `GET /api/jobs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveJobsResponse {
    /// Number of unfinished jobs.
    pub total_active_jobs: usize,
    /// Unfinished jobs, oldest first.
    pub jobs: Vec<JobStatus>,
}

/// A live cache entry as seen by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryResponse {
    /// Content hash.
    pub hash: String,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// When the entry was stored.
    pub created_at: DateTime<Utc>,
    /// When the entry expires.
    pub expires_at: DateTime<Utc>,
    /// Download token.
    pub download_token: String,
    /// Download URL.
    pub download_url: String,
}

impl CacheEntryResponse {
    /// Build from an entry and its download URL.
    pub fn new(entry: CacheEntry, download_url: String) -> Self {
        Self {
            hash: entry.hash,
            file_name: entry.original_name,
            content_type: entry.content_type,
            size_bytes: entry.size_bytes,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            download_token: entry.download_token.into_inner(),
            download_url,
        }
    }
}

/// Reply to `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the handler runs.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// Queue and job figures.
    pub scheduler: SchedulerStats,
    /// Cache occupancy.
    pub cache: CacheStats,
}

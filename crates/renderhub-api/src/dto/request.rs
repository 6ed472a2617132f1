//! Request DTOs.

use serde::{Deserialize, Serialize};

use renderhub_worker::SubmitRequest;

/// Body of `POST /api/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    /// Optional caller-chosen job id.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Payload handed to the renderer.
    pub payload: serde_json::Value,
    /// Rendering strategy tag.
    pub processing_mode: String,
    /// Content hash of the request, used for caching and short-circuiting.
    #[serde(default)]
    pub result_hash: Option<String>,
}

impl SubmitJobRequest {
    /// Trimmed, non-empty result hash.
    pub fn hash(&self) -> Option<&str> {
        self.result_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}

impl From<SubmitJobRequest> for SubmitRequest {
    fn from(req: SubmitJobRequest) -> Self {
        Self {
            job_id: req.job_id,
            payload: req.payload,
            processing_mode: req.processing_mode,
            result_hash: req.result_hash,
        }
    }
}

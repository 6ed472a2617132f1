//! Point-in-time job status snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use renderhub_core::error::AppError;
use renderhub_core::result::AppResult;
use renderhub_core::types::{DownloadToken, JobId};

use super::model::Job;
use super::state::JobState;

/// Floor for elapsed time when deriving throughput, in seconds.
pub const MIN_ELAPSED_SECONDS: f64 = 0.001;

/// Progress counters for a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Records processed so far.
    pub processed_records: u64,
    /// Total records reported by the renderer.
    pub total_records: u64,
    /// Completion percentage in `0.0..=100.0`.
    #[serde(rename = "percent")]
    pub percent_complete: f64,
    /// Throughput since the job started.
    pub records_per_second: f64,
    /// When a worker picked the job up.
    pub started_at: Option<DateTime<Utc>>,
}

/// Performance figures recorded when a job completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetrics {
    /// Time from submission to completion.
    pub total_duration_ms: u64,
    /// Time spent waiting for a worker slot.
    pub queue_wait_ms: u64,
    /// Time spent inside the renderer.
    pub render_duration_ms: u64,
    /// Time spent writing the artifact into the cache.
    pub cache_duration_ms: u64,
    /// Size of the produced artifact.
    pub output_size_bytes: u64,
    /// Records per second over the whole render.
    pub average_records_per_second: f64,
}

/// Snapshot of one job's state and progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Job identifier.
    pub job_id: JobId,
    /// Lifecycle state.
    #[serde(rename = "status")]
    pub state: JobState,
    /// Human-readable status message. Holds the error text once failed.
    pub message: String,
    /// Processing mode the job was submitted with.
    pub processing_mode: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Progress counters.
    pub progress: JobProgress,
    /// File name of the finished artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Token for downloading the finished artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_token: Option<DownloadToken>,
    /// Size of the finished artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Performance metrics of a completed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<JobMetrics>,
}

impl JobStatus {
    /// Initial snapshot for a freshly submitted job.
    pub fn queued(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            state: JobState::Queued,
            message: format!("Queued for processing (mode: {})", job.processing_mode),
            processing_mode: job.processing_mode.clone(),
            created_at: job.created_at,
            completed_at: None,
            progress: JobProgress::default(),
            file_name: None,
            download_token: None,
            size_bytes: None,
            metrics: None,
        }
    }

    /// Move to `Processing`, stamping the start time.
    pub fn start(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(JobState::Processing)?;
        self.progress.started_at = Some(now);
        self.message = format!("Processing (mode: {})", self.processing_mode);
        Ok(())
    }

    /// Apply a progress report.
    ///
    /// Ignored unless the job is processing. The percentage never decreases.
    /// Returns whether the snapshot changed.
    pub fn record_progress(&mut self, processed: u64, total: u64, now: DateTime<Utc>) -> bool {
        if self.state != JobState::Processing {
            return false;
        }

        let started_at = self.progress.started_at.unwrap_or(now);
        let elapsed = (now - started_at).num_milliseconds() as f64 / 1000.0;
        let elapsed = elapsed.max(MIN_ELAPSED_SECONDS);

        self.progress.processed_records = processed;
        self.progress.total_records = total;
        self.progress.records_per_second = processed as f64 / elapsed;

        if total > 0 {
            let percent = (processed as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
            self.progress.percent_complete = self.progress.percent_complete.max(percent);
        }

        self.message = if total > 0 {
            format!(
                "Processing (mode: {}): {}/{} records",
                self.processing_mode, processed, total
            )
        } else {
            format!(
                "Processing (mode: {}): {} records",
                self.processing_mode, processed
            )
        };
        true
    }

    /// Move to `Completed` with the cached artifact's details.
    pub fn complete(
        &mut self,
        now: DateTime<Utc>,
        file_name: String,
        token: DownloadToken,
        size_bytes: u64,
        metrics: JobMetrics,
    ) -> AppResult<()> {
        self.transition(JobState::Completed)?;
        self.completed_at = Some(now);
        self.progress.percent_complete = 100.0;
        self.message = format!("Completed: {file_name}");
        self.file_name = Some(file_name);
        self.download_token = Some(token);
        self.size_bytes = Some(size_bytes);
        self.metrics = Some(metrics);
        Ok(())
    }

    /// Move to `Failed`, keeping the error text as the message.
    pub fn fail(&mut self, now: DateTime<Utc>, error: impl Into<String>) -> AppResult<()> {
        self.transition(JobState::Failed)?;
        self.completed_at = Some(now);
        self.message = error.into();
        Ok(())
    }

    /// Instant used to age terminal jobs out of the registry.
    pub fn retention_anchor(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }

    fn transition(&mut self, next: JobState) -> AppResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Job {} cannot move from {} to {}",
                self.job_id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}

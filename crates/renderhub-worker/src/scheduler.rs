//! Scheduler facade: job submission and status queries.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use renderhub_cache::CacheStore;
use renderhub_core::config::worker::WorkerConfig;
use renderhub_core::error::AppError;
use renderhub_core::result::AppResult;
use renderhub_core::traits::Clock;
use renderhub_core::types::JobId;
use renderhub_entity::job::{Job, JobStatus};

use crate::executor::RenderExecutor;
use crate::queue::JobQueue;
use crate::registry::{JobRegistry, StateCounts};
use crate::runner::WorkerRunner;

/// A request to render one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Caller-chosen job id. Generated when absent.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Payload handed to the renderer.
    pub payload: serde_json::Value,
    /// Mode tag selecting the renderer.
    pub processing_mode: String,
    /// Key to cache the artifact under. Defaults to the job id.
    #[serde(default)]
    pub result_hash: Option<String>,
}

/// Queue and registry figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    /// Jobs per state.
    pub jobs: StateCounts,
    /// Jobs waiting in the queue.
    pub pending: usize,
    /// Size of the worker pool.
    pub concurrency: usize,
    /// Registered processing modes.
    pub modes: Vec<String>,
}

/// Accepts jobs and answers status queries. The paired [`WorkerRunner`]
/// does the processing.
#[derive(Debug)]
pub struct Scheduler {
    queue: JobQueue,
    registry: Arc<JobRegistry>,
    executor: Arc<RenderExecutor>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl Scheduler {
    /// Build a scheduler and the runner that drains its queue.
    pub fn new(
        config: &WorkerConfig,
        executor: RenderExecutor,
        registry: Arc<JobRegistry>,
        cache: Arc<CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> (Self, WorkerRunner) {
        let (queue, receiver) = JobQueue::new(config.max_pending);
        let executor = Arc::new(executor);

        let runner = WorkerRunner::new(
            receiver,
            Arc::clone(&executor),
            Arc::clone(&registry),
            cache,
            Arc::clone(&clock),
            config.clone(),
        );
        let scheduler = Self {
            queue,
            registry,
            executor,
            clock,
            concurrency: config.concurrency.max(1),
        };
        (scheduler, runner)
    }

    /// Enqueue a job and register it as `Queued`.
    ///
    /// Rejects an empty or unregistered mode, a malformed id, or an id that
    /// is already tracked. With a configured high-water mark, a full queue
    /// is rejected as `ServiceUnavailable`.
    pub fn submit(&self, request: SubmitRequest) -> AppResult<JobId> {
        self.validate(&request)?;
        let mode = request.processing_mode.trim();

        let id = match request.job_id {
            Some(raw) => JobId::parse(raw)?,
            None => JobId::generate(),
        };
        let result_hash = request
            .result_hash
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let job = Job {
            id: id.clone(),
            payload: request.payload,
            processing_mode: mode.to_string(),
            result_hash,
            created_at: self.clock.now(),
        };

        self.registry.insert(JobStatus::queued(&job))?;
        if let Err(e) = self.queue.enqueue(job) {
            self.registry.remove(id.as_str());
            return Err(e);
        }

        info!(job_id = %id, mode, pending = self.queue.pending(), "Job submitted");
        Ok(id)
    }

    /// Check a submission without creating anything.
    ///
    /// Rejects an empty or unregistered mode and a malformed job id.
    pub fn validate(&self, request: &SubmitRequest) -> AppResult<()> {
        let mode = request.processing_mode.trim();
        if mode.is_empty() {
            return Err(AppError::validation("processingMode must not be empty"));
        }
        if !self.executor.has_renderer(mode) {
            return Err(AppError::validation(format!(
                "Unknown processing mode '{}'; available: {}",
                mode,
                self.executor.modes().join(", ")
            )));
        }
        if let Some(raw) = &request.job_id {
            JobId::parse(raw.as_str())?;
        }
        Ok(())
    }

    /// Latest status of a job.
    pub fn get_status(&self, job_id: &str) -> AppResult<JobStatus> {
        self.registry
            .get(job_id)
            .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found")))
    }

    /// Jobs not yet finished, oldest first.
    pub fn list_active(&self) -> Vec<JobStatus> {
        self.registry.list_active()
    }

    /// Forget finished jobs older than `max_age`. Cached artifacts stay.
    pub fn purge_old(&self, max_age: Duration) -> usize {
        let purged = self
            .registry
            .purge_terminal_older_than(max_age, self.clock.now());
        debug!(purged, "Purged finished jobs");
        purged
    }

    /// Current queue and registry figures.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            jobs: self.registry.count_by_state(),
            pending: self.queue.pending(),
            concurrency: self.concurrency,
            modes: self.executor.modes(),
        }
    }
}

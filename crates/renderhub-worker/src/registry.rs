//! Concurrent job status registry.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;

use renderhub_core::error::AppError;
use renderhub_core::result::AppResult;
use renderhub_entity::job::{JobState, JobStatus};

/// Job counts per lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCounts {
    /// Jobs waiting for a worker.
    pub queued: usize,
    /// Jobs currently rendering.
    pub processing: usize,
    /// Jobs finished successfully.
    pub completed: usize,
    /// Jobs finished with an error.
    pub failed: usize,
}

/// Map from job id to its latest status snapshot.
///
/// Each update runs under the map's per-entry lock against a copy of the
/// snapshot, and the copy is committed only if the update succeeds.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<String, JobStatus>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job. Fails if the id is already taken.
    pub fn insert(&self, status: JobStatus) -> AppResult<()> {
        match self.jobs.entry(status.job_id.as_str().to_string()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Job {} already exists",
                status.job_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(status);
                Ok(())
            }
        }
    }

    /// Latest snapshot of a job.
    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.get(job_id).map(|s| s.value().clone())
    }

    /// Atomically apply `f` to one job's snapshot.
    pub fn update<T>(
        &self,
        job_id: &str,
        f: impl FnOnce(&mut JobStatus) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut current = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found")))?;

        let mut next = current.value().clone();
        let out = f(&mut next)?;
        *current = next;
        Ok(out)
    }

    /// Drop a job from the registry.
    pub fn remove(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.remove(job_id).map(|(_, status)| status)
    }

    /// Non-terminal jobs, oldest first.
    pub fn list_active(&self) -> Vec<JobStatus> {
        let mut active: Vec<JobStatus> = self
            .jobs
            .iter()
            .filter(|s| !s.state.is_terminal())
            .map(|s| s.value().clone())
            .collect();
        active.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        active
    }

    /// Remove terminal jobs that finished more than `max_age` before `now`.
    pub fn purge_terminal_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - max_age;
        let before = self.jobs.len();
        self.jobs
            .retain(|_, s| !(s.state.is_terminal() && s.retention_anchor() < cutoff));
        before.saturating_sub(self.jobs.len())
    }

    /// Count jobs in each state.
    pub fn count_by_state(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for status in self.jobs.iter() {
            match status.state {
                JobState::Queued => counts.queued += 1,
                JobState::Processing => counts.processing += 1,
                JobState::Completed => counts.completed += 1,
                JobState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Number of tracked jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no jobs are tracked.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

//! Progress sink that writes render progress into the job registry.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{trace, warn};

use renderhub_core::traits::{Clock, ProgressSink};
use renderhub_core::types::JobId;

use crate::registry::JobRegistry;

/// Reports one job's progress into the [`JobRegistry`].
#[derive(Debug, Clone)]
pub struct JobProgressReporter {
    job_id: JobId,
    registry: Arc<JobRegistry>,
    clock: Arc<dyn Clock>,
    cancel: watch::Receiver<bool>,
}

impl JobProgressReporter {
    /// Create a reporter for `job_id`. `cancel` is the service shutdown flag.
    pub fn new(
        job_id: JobId,
        registry: Arc<JobRegistry>,
        clock: Arc<dyn Clock>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            job_id,
            registry,
            clock,
            cancel,
        }
    }
}

impl ProgressSink for JobProgressReporter {
    fn report(&self, processed: u64, total: u64, mode: &str) {
        let now = self.clock.now();
        match self
            .registry
            .update(self.job_id.as_str(), |s| Ok(s.record_progress(processed, total, now)))
        {
            Ok(true) => trace!(job_id = %self.job_id, mode, processed, total, "Progress"),
            Ok(false) => trace!(job_id = %self.job_id, "Progress ignored, job is not processing"),
            Err(e) => warn!(job_id = %self.job_id, error = %e, "Failed to record progress"),
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

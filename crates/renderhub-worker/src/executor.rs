//! Render executor: dispatches jobs to renderers by processing mode.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use renderhub_core::error::AppError;
use renderhub_core::result::AppResult;
use renderhub_core::traits::{ProgressSink, RenderOutput, Renderer};
use renderhub_entity::job::Job;

/// Registered renderers keyed by processing mode.
#[derive(Debug, Default)]
pub struct RenderExecutor {
    renderers: HashMap<String, Arc<dyn Renderer>>,
}

impl RenderExecutor {
    /// Create an executor with no renderers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer under the mode it reports.
    pub fn register(&mut self, renderer: Arc<dyn Renderer>) {
        let mode = renderer.mode().to_string();
        info!(mode = %mode, "Registered renderer");
        self.renderers.insert(mode, renderer);
    }

    /// Whether a renderer serves `mode`.
    pub fn has_renderer(&self, mode: &str) -> bool {
        self.renderers.contains_key(mode)
    }

    /// Registered modes, sorted.
    pub fn modes(&self) -> Vec<String> {
        let mut modes: Vec<String> = self.renderers.keys().cloned().collect();
        modes.sort();
        modes
    }

    /// Render one job with the renderer for its mode.
    pub async fn execute(&self, job: &Job, progress: &dyn ProgressSink) -> AppResult<RenderOutput> {
        let renderer = self.renderers.get(&job.processing_mode).ok_or_else(|| {
            AppError::render(format!(
                "No renderer registered for processing mode '{}'",
                job.processing_mode
            ))
        })?;

        debug!(job_id = %job.id, mode = %job.processing_mode, "Invoking renderer");
        renderer
            .render(&job.payload, &job.processing_mode, progress)
            .await
    }
}

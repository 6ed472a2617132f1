//! Render contract consumed by the job scheduler.
//!
//! The rendering engine is opaque: it receives the job payload and its
//! processing mode, reports progress from inside its own execution, and
//! returns the finished artifact or an error. The scheduler performs no
//! retries.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Receives progress updates from a running render.
pub trait ProgressSink: Send + Sync {
    /// Report that `processed` of `total` records are done.
    fn report(&self, processed: u64, total: u64, mode: &str);

    /// Whether the host is shutting down.
    ///
    /// Long renders may poll this at safe checkpoints and bail out early.
    /// Nothing forces them to.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Progress sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _processed: u64, _total: u64, _mode: &str) {}
}

/// A finished artifact produced by a renderer.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Artifact bytes.
    pub bytes: Bytes,
    /// File name offered to the downloader.
    pub file_name: String,
    /// MIME type of the artifact.
    pub content_type: String,
}

/// An external rendering strategy selected by processing mode.
#[async_trait]
pub trait Renderer: Send + Sync + std::fmt::Debug + 'static {
    /// The processing mode tag this renderer serves.
    fn mode(&self) -> &str;

    /// Render the payload, calling `progress` as records are processed.
    async fn render(
        &self,
        payload: &serde_json::Value,
        mode: &str,
        progress: &dyn ProgressSink,
    ) -> AppResult<RenderOutput>;
}

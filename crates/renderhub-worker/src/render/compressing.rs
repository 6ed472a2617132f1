//! Renderer decorator that ships the inner renderer's output as an archive.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use renderhub_core::result::AppResult;
use renderhub_core::traits::{ArchiveEntry, Compressor, ProgressSink, RenderOutput, Renderer};

/// Wraps a renderer and compresses whatever it produces.
///
/// The archive is named after the inner file's stem with the extension of
/// the format the compressor actually used.
#[derive(Debug, Clone)]
pub struct CompressingRenderer {
    inner: Arc<dyn Renderer>,
    compressor: Arc<dyn Compressor>,
}

impl CompressingRenderer {
    /// Wrap `inner`, archiving its output with `compressor`.
    pub fn new(inner: Arc<dyn Renderer>, compressor: Arc<dyn Compressor>) -> Self {
        Self { inner, compressor }
    }
}

#[async_trait]
impl Renderer for CompressingRenderer {
    fn mode(&self) -> &str {
        self.inner.mode()
    }

    async fn render(
        &self,
        payload: &Value,
        mode: &str,
        progress: &dyn ProgressSink,
    ) -> AppResult<RenderOutput> {
        let output = self.inner.render(payload, mode, progress).await?;
        let raw_size = output.bytes.len();

        let archive = self
            .compressor
            .compress(&[ArchiveEntry {
                name: output.file_name.clone(),
                data: output.bytes,
            }])
            .await?;

        let stem = Path::new(&output.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("report");

        debug!(
            compressor = self.compressor.name(),
            raw_bytes = raw_size,
            archive_bytes = archive.bytes.len(),
            "Compressed render output"
        );

        Ok(RenderOutput {
            bytes: archive.bytes,
            file_name: format!("{stem}.{}", archive.extension),
            content_type: archive.content_type,
        })
    }
}

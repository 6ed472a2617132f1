//! Archive compressors.
//!
//! [`ZipCompressor`] builds ZIP archives in memory on the blocking pool.
//! [`FallbackCompressor`] tries a preferred compressor and falls back to a
//! second one when the first fails.

use std::io::{Cursor, Write};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use renderhub_core::error::{AppError, ErrorKind};
use renderhub_core::result::AppResult;
use renderhub_core::traits::{ArchiveEntry, CompressedArchive, Compressor};

/// ZIP archive compressor.
#[derive(Debug, Clone)]
pub struct ZipCompressor {
    deflate: bool,
}

impl ZipCompressor {
    /// Deflate-compressed entries.
    pub fn deflated() -> Self {
        Self { deflate: true }
    }

    /// Uncompressed entries.
    pub fn stored() -> Self {
        Self { deflate: false }
    }
}

#[async_trait]
impl Compressor for ZipCompressor {
    fn name(&self) -> &str {
        if self.deflate { "zip-deflate" } else { "zip-store" }
    }

    async fn compress(&self, entries: &[ArchiveEntry]) -> AppResult<CompressedArchive> {
        let entries = entries.to_vec();
        let method = if self.deflate {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };

        let bytes = tokio::task::spawn_blocking(move || build_zip(&entries, method))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Zip task failed", e))?
            .map_err(|e| AppError::with_source(ErrorKind::Render, "Failed to build zip archive", e))?;

        Ok(CompressedArchive {
            bytes: Bytes::from(bytes),
            extension: "zip".to_string(),
            content_type: "application/zip".to_string(),
        })
    }
}

fn build_zip(entries: &[ArchiveEntry], method: CompressionMethod) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&entry.data)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Prefer one compressor, fall back to another if it fails.
#[derive(Debug, Clone)]
pub struct FallbackCompressor {
    preferred: Arc<dyn Compressor>,
    fallback: Arc<dyn Compressor>,
}

impl FallbackCompressor {
    /// Create a fallback chain.
    pub fn new(preferred: Arc<dyn Compressor>, fallback: Arc<dyn Compressor>) -> Self {
        Self {
            preferred,
            fallback,
        }
    }
}

#[async_trait]
impl Compressor for FallbackCompressor {
    fn name(&self) -> &str {
        self.preferred.name()
    }

    async fn compress(&self, entries: &[ArchiveEntry]) -> AppResult<CompressedArchive> {
        match self.preferred.compress(entries).await {
            Ok(archive) => Ok(archive),
            Err(e) => {
                warn!(
                    preferred = self.preferred.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "Preferred compressor failed, falling back"
                );
                self.fallback.compress(entries).await
            }
        }
    }
}

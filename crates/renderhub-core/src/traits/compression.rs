//! Compression contract consumed by renderers that ship archives.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// A named blob placed into an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive.
    pub name: String,
    /// Entry contents.
    pub data: Bytes,
}

/// Output of a compressor.
#[derive(Debug, Clone)]
pub struct CompressedArchive {
    /// Archive bytes.
    pub bytes: Bytes,
    /// Extension of the format actually produced, without the dot (e.g. `"zip"`).
    pub extension: String,
    /// MIME type of the produced format.
    pub content_type: String,
}

/// Packs a set of named blobs into one archive.
#[async_trait]
pub trait Compressor: Send + Sync + std::fmt::Debug + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Compress the given entries.
    async fn compress(&self, entries: &[ArchiveEntry]) -> AppResult<CompressedArchive>;
}

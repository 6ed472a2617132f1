//! Content-addressable artifact store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use renderhub_core::config::cache::CacheConfig;
use renderhub_core::error::{AppError, ErrorKind};
use renderhub_core::result::AppResult;
use renderhub_core::traits::Clock;
use renderhub_core::types::DownloadToken;
use renderhub_entity::cache::CacheEntry;

use crate::hash::{content_hash, file_hash, hashes_match};
use crate::metadata::MetadataFile;

/// Directory under the cache root that holds artifact bytes.
const FILES_DIR: &str = "files";

/// Longest TTL honored, in seconds (100 years).
const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 3600;

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Entries in the metadata set, live or not.
    pub entries: usize,
    /// Entries still before their expiry.
    pub live_entries: usize,
    /// Sum of recorded entry sizes.
    pub total_size_bytes: u64,
    /// Configured ceiling. Informational only.
    pub max_size_bytes: u64,
}

/// Content-addressable file cache with TTL expiry.
///
/// Every mutation of the metadata set (store and sweep) happens under one
/// async mutex, and each mutation is persisted before the lock is released.
#[derive(Debug)]
pub struct CacheStore {
    /// Cache root directory.
    root: PathBuf,
    /// Directory holding artifact files.
    files_dir: PathBuf,
    /// Lifetime of new entries.
    pub(crate) ttl: Duration,
    /// Configured size ceiling.
    max_size_bytes: u64,
    /// Durable copy of the entry set.
    pub(crate) metadata: MetadataFile,
    /// In-memory entry set, the single source of truth while running.
    pub(crate) entries: Mutex<Vec<CacheEntry>>,
    /// Time source for expiry decisions.
    pub(crate) clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Open (or create) the cache described by `config`.
    ///
    /// Failing to create the cache directory is fatal: nothing else in the
    /// service can work without it.
    pub async fn open(config: &CacheConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let configured = PathBuf::from(&config.directory);
        fs::create_dir_all(configured.join(FILES_DIR))
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create cache directory: {}", configured.display()),
                    e,
                )
            })?;
        let root = fs::canonicalize(&configured).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to resolve cache directory: {}", configured.display()),
                e,
            )
        })?;
        let files_dir = root.join(FILES_DIR);

        let metadata = MetadataFile::new(root.join(&config.metadata_file));
        let mut entries = metadata.load().await?;
        rebase(&mut entries, &files_dir);
        let ttl = Duration::seconds(config.ttl_seconds.min(MAX_TTL_SECONDS) as i64);

        info!(
            directory = %root.display(),
            entries = entries.len(),
            ttl_seconds = config.ttl_seconds,
            "Cache store opened"
        );

        Ok(Self {
            root,
            files_dir,
            ttl,
            max_size_bytes: config.max_size_bytes,
            metadata,
            entries: Mutex::new(entries),
            clock,
        })
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an artifact.
    ///
    /// When `hash` is `None` the SHA-256 of `bytes` is used. If a live entry
    /// with the same hash still has its backing file, that entry is returned
    /// unchanged and nothing is written.
    pub async fn store(
        &self,
        bytes: Bytes,
        original_name: &str,
        content_type: &str,
        hash: Option<&str>,
    ) -> AppResult<CacheEntry> {
        let hash = match hash.map(str::trim) {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => content_hash(&bytes),
        };

        if let Some(existing) = self.find_by_hash(&hash).await {
            debug!(hash = %hash, token = %existing.download_token, "Cache hit on store, reusing entry");
            return Ok(existing);
        }

        let token = DownloadToken::generate();
        let path = self.path_for(&token, original_name);
        write_file(&path, &bytes).await?;

        let now = self.clock.now();
        let entry = CacheEntry {
            hash: hash.clone(),
            storage_path: path.clone(),
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
            created_at: now,
            expires_at: now + self.ttl,
            download_token: token,
        };

        let mut entries = self.entries.lock().await;

        // Another writer may have cached the same hash while our bytes were
        // being written.
        let same_hash: Vec<(usize, CacheEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, other)| other.hash == hash && other.is_live_at(now))
            .map(|(idx, other)| (idx, other.clone()))
            .collect();

        let mut dead = Vec::new();
        for (idx, other) in same_hash {
            if file_present(&other.storage_path).await {
                drop(entries);
                remove_quietly(&path).await;
                debug!(hash = %hash, "Lost store race, reusing concurrent entry");
                return Ok(other);
            }
            dead.push(idx);
        }
        for idx in dead.into_iter().rev() {
            let gone = entries.remove(idx);
            warn!(
                hash = %gone.hash,
                path = %gone.storage_path.display(),
                "Dropping cache entry whose backing file disappeared"
            );
        }

        entries.push(entry.clone());
        if let Err(e) = self.metadata.save(&entries).await {
            entries.pop();
            drop(entries);
            remove_quietly(&path).await;
            return Err(e);
        }

        let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
        drop(entries);
        if total > self.max_size_bytes {
            warn!(
                total_bytes = total,
                max_size_bytes = self.max_size_bytes,
                "Cache exceeds configured size; entries are only evicted on expiry"
            );
        }

        info!(
            hash = %entry.hash,
            token = %entry.download_token,
            size_bytes = entry.size_bytes,
            expires_at = %entry.expires_at,
            "Stored artifact in cache"
        );
        Ok(entry)
    }

    /// Look up a live entry by download token.
    pub async fn get_by_token(&self, token: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let candidate = {
            let entries = self.entries.lock().await;
            entries
                .iter()
                .find(|e| e.download_token.as_str() == token)
                .cloned()
        }?;

        if !candidate.is_live_at(now) {
            debug!(token, "Cache entry expired");
            return None;
        }
        if !file_present(&candidate.storage_path).await {
            return None;
        }
        Some(candidate)
    }

    /// Look up a live entry by content hash.
    pub async fn find_by_hash(&self, hash: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let candidates: Vec<CacheEntry> = {
            let entries = self.entries.lock().await;
            entries
                .iter()
                .rev()
                .filter(|e| e.hash == hash && e.is_live_at(now))
                .cloned()
                .collect()
        };

        for candidate in candidates {
            if file_present(&candidate.storage_path).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Read the artifact bytes behind a live token.
    pub async fn get_bytes(&self, token: &str) -> Option<Bytes> {
        let entry = self.get_by_token(token).await?;
        match fs::read(&entry.storage_path).await {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) => {
                warn!(
                    token,
                    path = %entry.storage_path.display(),
                    error = %e,
                    "Failed to read cached artifact"
                );
                None
            }
        }
    }

    /// Open the artifact behind a live token for streaming.
    pub async fn open_artifact(&self, token: &str) -> Option<(CacheEntry, fs::File)> {
        let entry = self.get_by_token(token).await?;
        match fs::File::open(&entry.storage_path).await {
            Ok(file) => Some((entry, file)),
            Err(e) => {
                warn!(
                    token,
                    path = %entry.storage_path.display(),
                    error = %e,
                    "Failed to open cached artifact"
                );
                None
            }
        }
    }

    /// Compose the public download URL for a token.
    pub fn generate_download_url(token: &str, base_url: &str) -> String {
        format!("{}/api/download/{}", base_url.trim_end_matches('/'), token)
    }

    /// Recompute the digest of the file at `path` and compare.
    pub async fn validate_hash(path: &Path, expected_hash: &str) -> AppResult<bool> {
        let actual = file_hash(path).await?;
        Ok(hashes_match(&actual, expected_hash))
    }

    /// Current occupancy figures.
    pub async fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        CacheStats {
            entries: entries.len(),
            live_entries: entries.iter().filter(|e| e.is_live_at(now)).count(),
            total_size_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            max_size_bytes: self.max_size_bytes,
        }
    }

    /// Backing path for a new artifact: the token plus the original extension.
    fn path_for(&self, token: &DownloadToken, original_name: &str) -> PathBuf {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()));

        match ext {
            Some(ext) => self
                .files_dir
                .join(format!("{}.{}", token, ext.to_ascii_lowercase())),
            None => self.files_dir.join(token.as_str()),
        }
    }
}

/// Point every entry at its file under `files_dir`.
///
/// Stored paths go stale when the cache directory moves or was configured
/// relative to another working directory; the file name is what identifies
/// the artifact.
fn rebase(entries: &mut [CacheEntry], files_dir: &Path) {
    for entry in entries {
        if let Some(name) = entry.storage_path.file_name() {
            let current = files_dir.join(name);
            if current != entry.storage_path {
                debug!(
                    from = %entry.storage_path.display(),
                    to = %current.display(),
                    "Rebased cache entry path"
                );
                entry.storage_path = current;
            }
        }
    }
}

/// Write bytes to `path` through a temp file so readers never see a partial artifact.
async fn write_file(path: &Path, data: &[u8]) -> AppResult<()> {
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".partial");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp, data).await {
        remove_quietly(&tmp).await;
        return Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to write cached artifact: {}", path.display()),
            e,
        ));
    }
    fs::rename(&tmp, path).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to finalize cached artifact: {}", path.display()),
            e,
        )
    })
}

/// Whether the backing file exists. I/O errors count as absent.
async fn file_present(path: &Path) -> bool {
    match fs::try_exists(path).await {
        Ok(exists) => exists,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to stat cached artifact");
            false
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}

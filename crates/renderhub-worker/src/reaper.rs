//! Reaper: periodic cache expiry sweep and finished-job retention.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, warn};

use renderhub_cache::CacheStore;
use renderhub_core::config::reaper::ReaperConfig;
use renderhub_core::result::AppResult;
use renderhub_core::traits::Clock;
use renderhub_entity::cache::CleanupResult;

use crate::registry::JobRegistry;
use crate::shutdown::shutdown_requested;

/// Longest job retention honored, in seconds (100 years).
const MAX_RETENTION_SECONDS: u64 = 100 * 365 * 24 * 3600;

/// Outcome of one reaper pass.
#[derive(Debug, Clone, Default)]
pub struct ReaperReport {
    /// Cache sweep result.
    pub cleanup: CleanupResult,
    /// Finished jobs dropped from the registry.
    pub jobs_purged: usize,
}

/// Background task that sweeps expired cache entries and old finished jobs.
#[derive(Debug)]
pub struct Reaper {
    cache: Arc<CacheStore>,
    registry: Arc<JobRegistry>,
    config: ReaperConfig,
    clock: Arc<dyn Clock>,
}

impl Reaper {
    /// Create a reaper over the given cache and registry.
    pub fn new(
        cache: Arc<CacheStore>,
        registry: Arc<JobRegistry>,
        config: ReaperConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            registry,
            config,
            clock,
        }
    }

    /// One pass: age out finished jobs, then sweep the cache.
    pub async fn run_once(&self) -> AppResult<ReaperReport> {
        let retention = chrono::Duration::seconds(
            self.config.job_retention_seconds.min(MAX_RETENTION_SECONDS) as i64,
        );
        let jobs_purged = self
            .registry
            .purge_terminal_older_than(retention, self.clock.now());
        let cleanup = self.cache.sweep().await?;
        Ok(ReaperReport {
            cleanup,
            jobs_purged,
        })
    }

    /// Sweep immediately, then on every interval until cancelled.
    ///
    /// A failed pass is retried after the shorter fallback interval.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.interval_seconds);
        let fallback = Duration::from_secs(self.config.fallback_interval_seconds);
        info!(
            interval_seconds = interval.as_secs(),
            fallback_seconds = fallback.as_secs(),
            "Reaper started"
        );

        loop {
            let wait = match self.run_once().await {
                Ok(report) => {
                    if !report.cleanup.is_success() {
                        warn!(
                            failed = report.cleanup.failed_deletions.len(),
                            paths = ?report.cleanup.failed_deletions,
                            "Some expired artifacts could not be deleted"
                        );
                    }
                    if report.jobs_purged > 0 || report.cleanup.files_deleted > 0 {
                        info!(
                            jobs_purged = report.jobs_purged,
                            files_deleted = report.cleanup.files_deleted,
                            space_freed_bytes = report.cleanup.space_freed_bytes,
                            "Reaper pass finished"
                        );
                    }
                    interval
                }
                Err(e) => {
                    error!(
                        error = %e,
                        retry_seconds = fallback.as_secs(),
                        "Reaper pass failed"
                    );
                    fallback
                }
            };

            tokio::select! {
                _ = shutdown_requested(&mut cancel) => break,
                _ = time::sleep(wait) => {}
            }
        }

        info!("Reaper stopped");
    }
}

//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use renderhub_cache::CacheStore;
use renderhub_core::config::AppConfig;
use renderhub_worker::Scheduler;

/// Shared dependencies, passed to every handler via `State<AppState>`.
///
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Job submission and status
    pub scheduler: Arc<Scheduler>,
    /// Artifact cache
    pub cache: Arc<CacheStore>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Bundle the shared services.
    pub fn new(config: Arc<AppConfig>, scheduler: Arc<Scheduler>, cache: Arc<CacheStore>) -> Self {
        Self {
            config,
            scheduler,
            cache,
            started_at: Instant::now(),
        }
    }

    /// Public download URL for a token.
    pub fn download_url(&self, token: &str) -> String {
        CacheStore::generate_download_url(token, &self.config.server.public_base_url)
    }
}

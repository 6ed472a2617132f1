//! Job scheduler and worker pool configuration.

use serde::{Deserialize, Serialize};

/// Background render worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of jobs allowed to render at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Delay in seconds before the dispatch loop resumes after a fault.
    #[serde(default = "default_loop_backoff")]
    pub loop_backoff_seconds: u64,
    /// Upper bound on queued jobs; `None` accepts any backlog.
    #[serde(default)]
    pub max_pending: Option<usize>,
    /// How long shutdown waits for in-flight renders, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            loop_backoff_seconds: default_loop_backoff(),
            max_pending: None,
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_loop_backoff() -> u64 {
    5
}

fn default_shutdown_grace() -> u64 {
    30
}

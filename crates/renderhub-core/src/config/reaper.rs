//! Background eviction configuration.

use serde::{Deserialize, Serialize};

/// Reaper (expiry sweep) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Seconds between regular sweeps.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Seconds before retrying after a sweep failed unexpectedly.
    #[serde(default = "default_fallback_interval")]
    pub fallback_interval_seconds: u64,
    /// How long terminal jobs stay queryable, in seconds.
    #[serde(default = "default_job_retention")]
    pub job_retention_seconds: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            fallback_interval_seconds: default_fallback_interval(),
            job_retention_seconds: default_job_retention(),
        }
    }
}

fn default_interval() -> u64 {
    300
}

fn default_fallback_interval() -> u64 {
    60
}

fn default_job_retention() -> u64 {
    86_400
}

//! Artifact cache configuration.

use serde::{Deserialize, Serialize};

/// Content-addressable file cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cached artifacts and the metadata file.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Lifetime of a cache entry in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Configured size ceiling in bytes. Reported, not enforced.
    #[serde(default = "default_max_size")]
    pub max_size_bytes: u64,
    /// File name of the persisted metadata set, relative to `directory`.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            ttl_seconds: default_ttl(),
            max_size_bytes: default_max_size(),
            metadata_file: default_metadata_file(),
        }
    }
}

fn default_directory() -> String {
    "./data/cache".to_string()
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_size() -> u64 {
    10_737_418_240 // 10 GB
}

fn default_metadata_file() -> String {
    "metadata.json".to_string()
}

//! Cache entities.

pub mod cleanup;
pub mod entry;

pub use cleanup::CleanupResult;
pub use entry::CacheEntry;

//! # renderhub-cache
//!
//! Content-addressable cache for finished artifacts.
//!
//! - Entries are deduplicated by content hash and retrieved by an opaque
//!   download token.
//! - Each entry expires after the configured TTL. Expiry is checked on every
//!   read; the bytes are removed later by [`CacheStore::sweep`].
//! - The metadata set is persisted as JSON and replaced atomically, so a
//!   restart keeps every live entry.

pub mod hash;
pub mod metadata;
pub mod store;
mod sweep;

pub use store::{CacheStats, CacheStore};

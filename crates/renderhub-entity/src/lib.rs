//! # renderhub-entity
//!
//! Data model shared by the scheduler, the cache, and the HTTP surface.

pub mod cache;
pub mod job;

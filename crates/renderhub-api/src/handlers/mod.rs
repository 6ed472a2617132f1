//! HTTP request handlers.

pub mod cache;
pub mod download;
pub mod health;
pub mod jobs;

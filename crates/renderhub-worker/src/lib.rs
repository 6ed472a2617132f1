//! Background render processing for RenderHub.
//!
//! This crate provides:
//! - A job registry holding the live status snapshot of every job
//! - A scheduler that accepts submissions and feeds a bounded worker pool
//! - A render executor that dispatches jobs to renderers by processing mode
//! - A reaper that expires cache entries and ages out finished jobs
//! - Built-in renderers and archive compressors

pub mod compression;
pub mod executor;
pub mod progress;
pub mod queue;
pub mod reaper;
pub mod registry;
pub mod render;
pub mod runner;
pub mod scheduler;
mod shutdown;

pub use executor::RenderExecutor;
pub use reaper::{Reaper, ReaperReport};
pub use registry::JobRegistry;
pub use runner::WorkerRunner;
pub use scheduler::{Scheduler, SchedulerStats, SubmitRequest};

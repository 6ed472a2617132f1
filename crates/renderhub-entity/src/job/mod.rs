//! Job entities.

pub mod model;
pub mod snapshot;
pub mod state;

pub use model::Job;
pub use snapshot::{JobMetrics, JobProgress, JobStatus};
pub use state::JobState;

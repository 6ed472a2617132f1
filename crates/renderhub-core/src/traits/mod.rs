//! Contracts implemented outside the core crate.

pub mod clock;
pub mod compression;
pub mod render;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compression::{ArchiveEntry, CompressedArchive, Compressor};
pub use render::{NoopProgress, ProgressSink, RenderOutput, Renderer};

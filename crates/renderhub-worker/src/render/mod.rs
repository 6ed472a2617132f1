//! Built-in renderers.

pub mod compressing;
pub mod jsonl;

pub use compressing::CompressingRenderer;
pub use jsonl::JsonLinesRenderer;

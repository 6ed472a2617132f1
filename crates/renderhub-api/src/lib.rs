//! # renderhub-api
//!
//! HTTP API layer for RenderHub built on Axum.
//!
//! Exposes job submission, status polling, artifact download and cache
//! lookup endpoints, and maps [`renderhub_core::AppError`] to HTTP responses.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;

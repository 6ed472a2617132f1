//! Convenience result type alias for RenderHub.

use crate::error::AppError;

/// A specialized `Result` type for RenderHub operations.
pub type AppResult<T> = Result<T, AppError>;

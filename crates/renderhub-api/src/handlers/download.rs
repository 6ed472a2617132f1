//! Artifact download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use renderhub_core::error::AppError;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/download/{token}
///
/// Streams the artifact. Expired, unknown, and unreadable tokens are all 404.
pub async fn download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Response> {
    let (entry, file) = state
        .cache
        .open_artifact(&token)
        .await
        .ok_or_else(|| AppError::not_found("Download not found or expired"))?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, entry.content_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", header_safe(&entry.original_name)),
        )
        .header(header::CONTENT_LENGTH, entry.size_bytes)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;

    Ok(response)
}

/// Strip characters that would break a quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect()
}

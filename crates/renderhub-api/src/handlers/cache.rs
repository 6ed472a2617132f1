//! Cache lookup handler.

use axum::Json;
use axum::extract::{Path, State};

use renderhub_core::error::AppError;

use crate::dto::response::CacheEntryResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/cache/{hash}
pub async fn find_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> ApiResult<Json<CacheEntryResponse>> {
    let entry = state
        .cache
        .find_by_hash(&hash)
        .await
        .ok_or_else(|| AppError::not_found(format!("No live cache entry for hash {hash}")))?;

    let url = state.download_url(entry.download_token.as_str());
    Ok(Json(CacheEntryResponse::new(entry, url)))
}

//! Route definitions for the RenderHub HTTP API.
//!
//! All routes are mounted under `/api`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;

    let api_routes = Router::new()
        .merge(job_routes())
        .merge(download_routes())
        .merge(cache_routes())
        .route("/health", get(handlers::health::health));

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Submission, status, active list
fn job_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/jobs",
            post(handlers::jobs::submit_job).get(handlers::jobs::list_active_jobs),
        )
        .route("/jobs/{id}", get(handlers::jobs::get_job))
}

fn download_routes() -> Router<AppState> {
    Router::new().route("/download/{token}", get(handlers::download::download))
}

fn cache_routes() -> Router<AppState> {
    Router::new().route("/cache/{hash}", get(handlers::cache::find_by_hash))
}

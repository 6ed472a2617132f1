//! Job submission and status handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use renderhub_entity::job::{JobState, JobStatus};
use renderhub_worker::SubmitRequest;

use crate::dto::request::SubmitJobRequest;
use crate::dto::response::{ActiveJobsResponse, SubmitJobResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/jobs
///
/// The submission is validated first. A valid request whose `resultHash`
/// already has a live cache entry is answered from the cache without
/// creating a job, so that reply carries no `jobId`.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let Json(req) = body?;
    let hash = req.hash().map(str::to_string);
    let request: SubmitRequest = req.into();
    state.scheduler.validate(&request)?;

    if let Some(hash) = hash {
        if let Some(entry) = state.cache.find_by_hash(&hash).await {
            tracing::info!(hash = %hash, token = %entry.download_token, "Submission answered from cache");
            return Ok((
                StatusCode::OK,
                Json(SubmitJobResponse {
                    job_id: None,
                    status: JobState::Completed,
                    cached: true,
                    download_url: Some(state.download_url(entry.download_token.as_str())),
                    download_token: Some(entry.download_token.into_inner()),
                }),
            ));
        }
    }

    let job_id = state.scheduler.submit(request)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id: Some(job_id.into_inner()),
            status: JobState::Queued,
            cached: false,
            download_token: None,
            download_url: None,
        }),
    ))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    Ok(Json(state.scheduler.get_status(&id)?))
}

/// GET /api/jobs
pub async fn list_active_jobs(State(state): State<AppState>) -> Json<ActiveJobsResponse> {
    let jobs = state.scheduler.list_active();
    Json(ActiveJobsResponse {
        total_active_jobs: jobs.len(),
        jobs,
    })
}

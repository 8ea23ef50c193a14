use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use super::dto::{
    CancelJobResponse, JobResponse, ListJobsQuery, SubmitJobRequest, SubmitJobResponse,
};
use super::service::JobService;
use crate::common::response::ErrorResponse;
use crate::state::AppState;

/// Submit a transcoding job
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 201, description = "Job accepted", body = SubmitJobResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(payload): Json<SubmitJobRequest>,
) -> impl IntoResponse {
    match JobService::submit(&state, payload) {
        Ok(res) => (StatusCode::CREATED, Json(res)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get the status of a job
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job record", body = JobResponse),
        (status = 404, description = "Unknown job", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match JobService::status(&state, id) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a job
///
/// Queued jobs cancel immediately; running jobs are cancelled
/// cooperatively by the executing worker.
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Cancellation accepted", body = CancelJobResponse),
        (status = 404, description = "Unknown job", body = ErrorResponse),
        (status = 409, description = "Job already finished", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match JobService::cancel(&state, id) {
        Ok(ack) => (StatusCode::ACCEPTED, Json(ack)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List jobs, optionally filtered by state
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    params(
        ("state" = Option<String>, Query, description = "Filter by job state (queued, running, succeeded, failed, cancelled)")
    ),
    responses(
        (status = 200, description = "Jobs in submission order", body = Vec<JobResponse>),
        (status = 400, description = "Unknown state filter", body = ErrorResponse)
    ),
    tag = "Jobs"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> impl IntoResponse {
    match JobService::list(&state, query.state) {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(e) => e.into_response(),
    }
}

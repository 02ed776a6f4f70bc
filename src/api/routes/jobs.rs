//! Job handlers: submission, progress polling, listing, cancellation, metadata.

use super::InfoQuery;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{DownloadRequest, JobId, JobInfo, JobSnapshot, MediaInfo, SubmitResponse};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /download - Submit a download job
#[utoipa::path(
    post,
    path = "/download",
    tag = "jobs",
    request_body = DownloadRequest,
    responses(
        (status = 201, description = "Job accepted", body = SubmitResponse),
        (status = 400, description = "Missing or invalid field", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return Error::invalid_request("body", rejection.body_text()).into_response();
        }
    };

    match state.coordinator.submit(request).await {
        Ok(id) => (StatusCode::CREATED, Json(SubmitResponse { id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /progress/:id - Poll a job's status and progress
///
/// Unknown and malformed ids both answer with the `Unknown ID` sentinel.
#[utoipa::path(
    get,
    path = "/progress/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Current status and progress", body = JobSnapshot)
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<JobSnapshot> {
    let snapshot = match id.parse::<JobId>() {
        Ok(id) => state.coordinator.query_status(id).await,
        Err(_) => JobSnapshot::unknown(),
    };
    Json(snapshot)
}

/// GET /jobs - List all tracked jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "All tracked jobs, oldest first", body = Vec<JobInfo>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobInfo>> {
    Json(state.coordinator.list_jobs().await)
}

/// GET /jobs/:id - Get a single job
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job information", body = JobInfo),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobInfo>, Error> {
    let job_id = id.parse::<JobId>().map_err(|_| Error::NotFound(id.clone()))?;
    state
        .coordinator
        .get_job(job_id)
        .await
        .map(Json)
        .ok_or(Error::NotFound(id))
}

/// DELETE /jobs/:id - Cancel a running job
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 204, description = "Cancellation requested"),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job already finished", body = crate::error::ApiError)
    )
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    let job_id = id.parse::<JobId>().map_err(|_| Error::NotFound(id))?;
    state.coordinator.cancel(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /info - Look up media metadata without downloading
#[utoipa::path(
    get,
    path = "/info",
    tag = "jobs",
    params(InfoQuery),
    responses(
        (status = 200, description = "Media metadata", body = MediaInfo),
        (status = 400, description = "Missing url", body = crate::error::ApiError),
        (status = 501, description = "No extraction engine available", body = crate::error::ApiError),
        (status = 502, description = "Engine could not resolve the url", body = crate::error::ApiError)
    )
)]
pub async fn probe_media(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> Result<Json<MediaInfo>, Error> {
    state.coordinator.probe(&query.url).await.map(Json)
}

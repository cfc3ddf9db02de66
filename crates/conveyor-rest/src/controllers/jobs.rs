//! Job management endpoints.

use crate::responses::{bad_request, ApiError, JobEnvelope, JobListEnvelope, StatusEnvelope};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use conveyor_core::{ConveyorError, FieldErrors, JobId, JobStatus, PageParams, TaskKind};
use conveyor_service::CreateJobRequest;
use conveyor_store::JobSearchCriteria;
use serde::Deserialize;

/// Creates the jobs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/jobs", post(create_job).get(search_jobs))
        .route("/v1/jobs/:id", get(get_job))
        .route("/v1/jobs/:id/status", get(get_job_status))
        .route("/v1/jobs/:id/schedule", post(schedule_job))
        .route("/v1/jobs/:id/cancel", post(cancel_job))
}

/// Body for `POST /v1/jobs/:id/schedule`.
#[derive(Debug, Deserialize)]
struct ScheduleJobRequest {
    run_at: DateTime<Utc>,
}

/// Query parameters for `GET /v1/jobs`.
#[derive(Debug, Deserialize)]
struct SearchJobsParams {
    task: Option<String>,
    status: Option<String>,
    run_at_from: Option<DateTime<Utc>>,
    run_at_to: Option<DateTime<Utc>>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
    #[serde(default = "default_sort")]
    sort: String,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

fn default_sort() -> String {
    "-created_at".to_string()
}

fn parse_id(id: &str) -> Result<JobId, ApiError> {
    JobId::parse(id).map_err(|_| ApiError(ConveyorError::not_found("job", id)))
}

async fn create_job(
    State(state): State<AppState>,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return Ok(bad_request(rejection.body_text())),
    };

    let job = state.job_service.create_job(request).await?;

    Ok((StatusCode::CREATED, Json(JobEnvelope { job })).into_response())
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobEnvelope>, ApiError> {
    let job = state.job_service.get_job(parse_id(&id)?).await?;
    Ok(Json(JobEnvelope { job }))
}

async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusEnvelope>, ApiError> {
    let job = state.job_service.get_job(parse_id(&id)?).await?;
    Ok(Json(StatusEnvelope { status: job.status }))
}

async fn schedule_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ScheduleJobRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => return Ok(bad_request(rejection.body_text())),
    };

    let job = state
        .job_service
        .schedule_job(parse_id(&id)?, request.run_at)
        .await?;

    Ok(Json(JobEnvelope { job }).into_response())
}

async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobEnvelope>, ApiError> {
    let job = state.job_service.cancel_job(parse_id(&id)?).await?;
    Ok(Json(JobEnvelope { job }))
}

async fn search_jobs(
    State(state): State<AppState>,
    Query(params): Query<SearchJobsParams>,
) -> Result<Json<JobListEnvelope>, ApiError> {
    let mut errors = FieldErrors::new();

    let status = match &params.status {
        Some(raw) => {
            let parsed = JobStatus::parse(raw);
            errors.check(parsed.is_some(), "status", "invalid status value");
            parsed
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(ApiError(ConveyorError::Validation(errors)));
    }

    let criteria = JobSearchCriteria {
        task: params.task.map(TaskKind::new),
        status,
        run_at_from: params.run_at_from,
        run_at_to: params.run_at_to,
    };
    let page_params = PageParams {
        page: params.page,
        page_size: params.page_size,
        sort_by: params.sort,
    };

    let page = state
        .job_service
        .search_jobs(&criteria, &page_params)
        .await?;

    Ok(Json(JobListEnvelope {
        jobs: page.items,
        metadata: page.metadata,
    }))
}

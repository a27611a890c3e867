//! Job CRUD. Every handler runs behind `auth_middleware` and scopes store
//! calls to the caller, so another user's job reads as missing.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::dtos::jobs::{
    CreateJobRequest, DeleteJobResponse, JobListResponse, JobResponse, ListJobsParams,
    UpdateJobRequest,
};
use crate::middleware::AuthUser;
use crate::models::Job;
use crate::utils::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::AppState;

fn job_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("No job with id {}", id))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedQuery(params): ValidatedQuery<ListJobsParams>,
) -> Result<Json<JobListResponse>, AppError> {
    let filter = params.into_filter()?;
    let page = state.store.list_jobs(&caller.user_id, &filter).await?;

    Ok(Json(JobListResponse::new(page.jobs, page.total, filter.limit)))
}

pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let job = Job::new(
        caller.user_id,
        req.title,
        req.company,
        req.status.unwrap_or_default(),
    );
    state.store.insert_job(&job).await?;

    tracing::info!(job_id = %job.id, "Job created");

    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

pub async fn get_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedPath(id): ValidatedPath<String>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .store
        .find_job(&id, &caller.user_id)
        .await?
        .ok_or_else(|| job_not_found(&id))?;

    Ok(Json(JobResponse::from(job)))
}

pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedPath(id): ValidatedPath<String>,
    ValidatedJson(req): ValidatedJson<UpdateJobRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let changes = req.into_changes()?;

    let job = state
        .store
        .update_job(&id, &caller.user_id, &changes)
        .await?
        .ok_or_else(|| job_not_found(&id))?;

    Ok(Json(JobResponse::from(job)))
}

pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedPath(id): ValidatedPath<String>,
) -> Result<Json<DeleteJobResponse>, AppError> {
    if !state.store.delete_job(&id, &caller.user_id).await? {
        return Err(job_not_found(&id));
    }

    tracing::info!(job_id = %id, "Job removed");

    Ok(Json(DeleteJobResponse {
        message: "Job removed".to_string(),
        id,
    }))
}

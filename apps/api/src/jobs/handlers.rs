use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::jobs;
use crate::models::job::{is_valid_status, JobRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// POST /jobs
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Job title is required".to_string()));
    }
    if req.description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required".to_string(),
        ));
    }
    let status = req.status.as_deref().unwrap_or("open");
    if !is_valid_status(status) {
        return Err(AppError::Validation(format!("Invalid job status: {status}")));
    }

    let job = jobs::insert(
        &state.db,
        user.user_id,
        req.title.trim(),
        &req.description,
        status,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(jobs::list(&state.db, user.user_id).await?))
}

/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<JobRow>, AppError> {
    let id = parse_id(&id)?;
    let job = jobs::find_by_id(&state.db, user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
    Ok(Json(job))
}

/// PATCH /jobs/:id
pub async fn update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobRow>, AppError> {
    let id = parse_id(&id)?;
    if let Some(status) = req.status.as_deref() {
        if !is_valid_status(status) {
            return Err(AppError::Validation(format!("Invalid job status: {status}")));
        }
    }

    let job = jobs::update(
        &state.db,
        user.user_id,
        id,
        req.title.as_deref(),
        req.description.as_deref(),
        req.status.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
    Ok(Json(job))
}

/// DELETE /jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id)?;
    if !jobs::delete(&state.db, user.user_id, id).await? {
        return Err(AppError::NotFound("Job not found".to_string()));
    }
    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid job id: {raw}")))
}

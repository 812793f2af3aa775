use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::applications;
use crate::auth::AuthUser;
use crate::digest;
use crate::errors::AppError;
use crate::ingest;
use crate::jobs;
use crate::models::application::{ApplicationRow, AttachmentMetaRow};
use crate::models::job::JobRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchEmailsQuery {
    #[serde(rename = "jobTitle")]
    pub job_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FetchEmailsResponse {
    pub success: bool,
    pub applications: Vec<ApplicationRow>,
    pub processed: usize,
    pub skipped: usize,
    pub total: usize,
}

/// GET /applications/fetch-emails?jobTitle=...
pub async fn fetch_emails(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<FetchEmailsQuery>,
) -> Result<Json<FetchEmailsResponse>, AppError> {
    let job_title = params
        .job_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Job title is required".to_string()))?;

    let outcome = ingest::run_ingestion(&state, user.user_id, job_title).await?;
    Ok(Json(FetchEmailsResponse {
        success: true,
        applications: outcome.applications,
        processed: outcome.processed,
        skipped: outcome.skipped,
        total: outcome.total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListApplicationsQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

/// GET /applications?jobId=...
pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    let job_id = params
        .job_id
        .as_deref()
        .map(|raw| parse_id(raw, "job"))
        .transpose()?;
    Ok(Json(applications::list(&state.db, user.user_id, job_id).await?))
}

#[derive(Debug, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub job: Option<JobRow>,
    pub attachments: Vec<AttachmentMetaRow>,
}

/// GET /applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApplicationDetail>, AppError> {
    let id = parse_id(&id, "application")?;
    let application = applications::find(&state.db, user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    // The referenced job may have been deleted out from under us.
    let job = jobs::find_by_id(&state.db, user.user_id, application.job_id).await?;
    let attachments = applications::attachment_meta(&state.db, application.id).await?;

    Ok(Json(ApplicationDetail {
        application,
        job,
        attachments,
    }))
}

/// GET /applications/:applicationId/attachments/:attachmentId
pub async fn download_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((application_id, attachment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let application_id = parse_id(&application_id, "application")?;
    let attachment_id = parse_id(&attachment_id, "attachment")?;

    let application = applications::find(&state.db, user.user_id, application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    let attachment = applications::find_attachment(&state.db, application.id, attachment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attachment not found".to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, attachment.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment.filename),
        ),
    ];
    Ok((headers, attachment.data))
}

/// PATCH /applications/:id/shortlist
pub async fn toggle_shortlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApplicationRow>, AppError> {
    let id = parse_id(&id, "application")?;
    let application = applications::toggle_shortlist(&state.db, user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
    Ok(Json(application))
}

#[derive(Debug, Deserialize)]
pub struct SendShortlistedRequest {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

/// POST /applications/send-shortlisted
pub async fn send_shortlisted(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SendShortlistedRequest>,
) -> Result<Json<Value>, AppError> {
    let job_id = parse_id(&req.job_id, "job")?;
    let outcome = digest::send_shortlist_digest(&state, user.user_id, job_id).await?;
    Ok(Json(json!({
        "success": true,
        "sent": outcome.sent,
        "recipient": outcome.recipient,
    })))
}

/// DELETE /applications/:id
pub async fn delete_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "application")?;
    if !applications::delete(&state.db, user.user_id, id).await? {
        return Err(AppError::NotFound("Application not found".to_string()));
    }
    Ok(Json(json!({ "message": "Application deleted successfully" })))
}

fn parse_id(raw: &str, kind: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid {kind} id: {raw}")))
}

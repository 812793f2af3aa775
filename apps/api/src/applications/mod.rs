//! Application store: persistence and query filtering for assembled
//! applications and their attachments.

pub mod handlers;

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationRow, AttachmentMetaRow, AttachmentRow};

/// One attachment ready to persist alongside a new application.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct NewApplication<'a> {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub applicant_name: &'a str,
    pub applicant_email: &'a str,
    pub resume_text: &'a str,
    pub email_body: &'a str,
    pub ai_score: f64,
    pub ai_summary: &'a str,
    pub gmail_message_id: &'a str,
    pub gmail_thread_id: &'a str,
    pub attachments: Vec<NewAttachment>,
}

/// Persists an application and its attachments in one transaction, so a
/// half-written application can never satisfy the dedup check.
pub async fn insert_with_attachments(
    pool: &PgPool,
    new: NewApplication<'_>,
) -> Result<ApplicationRow, AppError> {
    let mut tx = pool.begin().await?;

    let application: ApplicationRow = sqlx::query_as(
        r#"
        INSERT INTO applications
            (id, job_id, user_id, applicant_name, applicant_email, resume_text,
             email_body, ai_score, ai_summary, gmail_message_id, gmail_thread_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.job_id)
    .bind(new.user_id)
    .bind(new.applicant_name)
    .bind(new.applicant_email)
    .bind(new.resume_text)
    .bind(new.email_body)
    .bind(new.ai_score)
    .bind(new.ai_summary)
    .bind(new.gmail_message_id)
    .bind(new.gmail_thread_id)
    .fetch_one(&mut *tx)
    .await?;

    for attachment in &new.attachments {
        sqlx::query(
            r#"
            INSERT INTO attachments (id, application_id, filename, content_type, data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(application.id)
        .bind(&attachment.filename)
        .bind(&attachment.content_type)
        .bind(&attachment.data)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(application)
}

pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    job_id: Option<Uuid>,
) -> Result<Vec<ApplicationRow>, AppError> {
    let rows: Vec<ApplicationRow> = match job_id {
        Some(job_id) => {
            sqlx::query_as(
                "SELECT * FROM applications WHERE user_id = $1 AND job_id = $2 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .bind(job_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM applications WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

pub async fn find(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<ApplicationRow>, AppError> {
    let row: Option<ApplicationRow> =
        sqlx::query_as("SELECT * FROM applications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

/// The dedup set: every Gmail message id already recorded against this job.
pub async fn message_ids_for_job(
    pool: &PgPool,
    job_id: Uuid,
) -> Result<HashSet<String>, AppError> {
    let ids: Vec<(String,)> =
        sqlx::query_as("SELECT gmail_message_id FROM applications WHERE job_id = $1")
            .bind(job_id)
            .fetch_all(pool)
            .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// Shortlisted applications not yet included in a digest.
pub async fn unsent_shortlisted(
    pool: &PgPool,
    user_id: Uuid,
    job_id: Uuid,
) -> Result<Vec<ApplicationRow>, AppError> {
    let rows: Vec<ApplicationRow> = sqlx::query_as(
        r#"
        SELECT * FROM applications
        WHERE user_id = $1 AND job_id = $2 AND is_shortlisted = TRUE AND sent_at IS NULL
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .bind(job_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Stamps every listed application as sent; a later digest run will not
/// pick them up again.
pub async fn mark_sent(pool: &PgPool, ids: &[Uuid]) -> Result<(), AppError> {
    sqlx::query("UPDATE applications SET sent_at = now() WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn toggle_shortlist(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<ApplicationRow>, AppError> {
    let row: Option<ApplicationRow> = sqlx::query_as(
        r#"
        UPDATE applications
        SET is_shortlisted = NOT is_shortlisted
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Attachment listings never load the binary payload.
pub async fn attachment_meta(
    pool: &PgPool,
    application_id: Uuid,
) -> Result<Vec<AttachmentMetaRow>, AppError> {
    let rows: Vec<AttachmentMetaRow> = sqlx::query_as(
        r#"
        SELECT id, application_id, filename, content_type, created_at
        FROM attachments WHERE application_id = $1 ORDER BY created_at
        "#,
    )
    .bind(application_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_attachment(
    pool: &PgPool,
    application_id: Uuid,
    attachment_id: Uuid,
) -> Result<Option<AttachmentRow>, AppError> {
    let row: Option<AttachmentRow> =
        sqlx::query_as("SELECT * FROM attachments WHERE id = $1 AND application_id = $2")
            .bind(attachment_id)
            .bind(application_id)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

/// Full attachments, payload included, for the digest sender.
pub async fn attachments_with_data(
    pool: &PgPool,
    application_id: Uuid,
) -> Result<Vec<AttachmentRow>, AppError> {
    let rows: Vec<AttachmentRow> =
        sqlx::query_as("SELECT * FROM attachments WHERE application_id = $1 ORDER BY created_at")
            .bind(application_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

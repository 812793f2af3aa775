#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub applicant_name: String,
    pub applicant_email: String,
    pub resume_text: String,
    pub email_body: String,
    pub ai_score: f64,
    pub ai_summary: String,
    pub is_shortlisted: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub gmail_message_id: String,
    pub gmail_thread_id: String,
    pub created_at: DateTime<Utc>,
}

/// Full attachment row including the binary payload. Only loaded for
/// downloads and the shortlist digest; listings use [`AttachmentMetaRow`].
#[derive(Debug, Clone, FromRow)]
pub struct AttachmentRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttachmentMetaRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One stored OAuth token set, tied to one mailbox and optionally one user.
/// `user_id = NULL` marks the shared default credential.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CredentialRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email_address: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub token_type: String,
    pub scope: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

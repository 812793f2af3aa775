#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Argon2id hash. Never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub preferred_credential_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

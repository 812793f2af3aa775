#![allow(dead_code)]
//! Credential store: stored OAuth token sets, one per connected mailbox.
//!
//! Resolution order for "which account does this user send/read mail as":
//! the user's preferred mailbox, else any mailbox the user connected, else
//! the shared default credential.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::credential::CredentialRow;

/// Resolves the credential to use for `user_id`, in preference order.
pub async fn resolve(pool: &PgPool, user_id: Uuid) -> Result<CredentialRow, AppError> {
    let preferred: Option<CredentialRow> = sqlx::query_as(
        r#"
        SELECT c.* FROM oauth_credentials c
        JOIN users u ON u.preferred_credential_id = c.id
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some(credential) = preferred {
        return Ok(credential);
    }

    let owned: Option<CredentialRow> = sqlx::query_as(
        "SELECT * FROM oauth_credentials WHERE user_id = $1 ORDER BY created_at LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some(credential) = owned {
        return Ok(credential);
    }

    let default: Option<CredentialRow> =
        sqlx::query_as("SELECT * FROM oauth_credentials WHERE is_default = TRUE LIMIT 1")
            .fetch_optional(pool)
            .await?;

    default.ok_or_else(|| AppError::NotFound("No Gmail account connected".to_string()))
}

/// All credentials visible to the user: their own plus the shared default.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<CredentialRow>, AppError> {
    let rows: Vec<CredentialRow> = sqlx::query_as(
        r#"
        SELECT * FROM oauth_credentials
        WHERE user_id = $1 OR is_default = TRUE
        ORDER BY is_default, created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Pre-check used to give a friendly 400 before the unique index would
/// reject the insert anyway.
pub async fn is_mailbox_connected(pool: &PgPool, address: &str) -> Result<bool, AppError> {
    Ok(find_by_address(pool, address).await?.is_some())
}

pub async fn find_by_address(
    pool: &PgPool,
    address: &str,
) -> Result<Option<CredentialRow>, AppError> {
    let row: Option<CredentialRow> =
        sqlx::query_as("SELECT * FROM oauth_credentials WHERE email_address = $1")
            .bind(address)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

pub struct NewCredential<'a> {
    pub user_id: Uuid,
    pub email_address: &'a str,
    pub access_token: &'a str,
    pub refresh_token: &'a str,
    pub token_type: &'a str,
    pub scope: &'a str,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Persists a freshly exchanged token set for a newly connected mailbox.
pub async fn insert(
    pool: &PgPool,
    credential: &NewCredential<'_>,
) -> Result<CredentialRow, AppError> {
    let row: CredentialRow = sqlx::query_as(
        r#"
        INSERT INTO oauth_credentials
            (id, user_id, email_address, access_token, refresh_token,
             token_type, scope, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(credential.user_id)
    .bind(credential.email_address)
    .bind(credential.access_token)
    .bind(credential.refresh_token)
    .bind(credential.token_type)
    .bind(credential.scope)
    .bind(credential.expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Overwrites the stored token set after a provider refresh. The provider
/// only rotates the refresh token sometimes, so a missing one keeps the
/// stored value. Stale access tokens must never be served after this runs.
pub async fn store_rotated_tokens(
    pool: &PgPool,
    credential_id: Uuid,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<CredentialRow, AppError> {
    let row: CredentialRow = sqlx::query_as(
        r#"
        UPDATE oauth_credentials
        SET access_token = $2,
            refresh_token = COALESCE($3, refresh_token),
            expires_at = $4,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(credential_id)
    .bind(access_token)
    .bind(refresh_token)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Re-points an existing credential's tokens when the same user reconnects
/// the same mailbox through the consent flow again.
pub async fn replace_tokens(
    pool: &PgPool,
    credential_id: Uuid,
    credential: &NewCredential<'_>,
) -> Result<CredentialRow, AppError> {
    let row: CredentialRow = sqlx::query_as(
        r#"
        UPDATE oauth_credentials
        SET access_token = $2,
            refresh_token = $3,
            token_type = $4,
            scope = $5,
            expires_at = $6,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(credential_id)
    .bind(credential.access_token)
    .bind(credential.refresh_token)
    .bind(credential.token_type)
    .bind(credential.scope)
    .bind(credential.expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

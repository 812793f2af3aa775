use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{self, AuthUser};
use crate::credentials::{self, NewCredential};
use crate::errors::AppError;
use crate::models::credential::CredentialRow;
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user
        .filter(|u| auth::verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let token = auth::issue_token(user.id, &state.config.jwt_secret)?;
    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: user.id,
            name: user.name,
            email: user.email,
        },
    }))
}

/// GET /auth/check
pub async fn check(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserRow>, AppError> {
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.db)
        .await?;
    let row = row.ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;
    Ok(Json(row))
}

/// GET /auth/google/url
pub async fn google_auth_url(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let state_token = auth::issue_state_token(user.user_id, &state.config.jwt_secret)?;
    let url = state.gmail.consent_url(&state_token);
    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /auth/google/callback?code=&state=
///
/// The redirect from Google carries no bearer header; the `state` token
/// issued by `google_auth_url` identifies the connecting user.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackQuery>,
) -> Result<Json<Value>, AppError> {
    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Authorization code is required".to_string()))?;
    let state_token = params
        .state
        .as_deref()
        .ok_or_else(|| AppError::Validation("State parameter is required".to_string()))?;

    let claims = auth::verify_token(state_token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired state token".to_string()))?;
    let user_id = claims.sub;

    let tokens = state
        .gmail
        .exchange_code(code)
        .await
        .map_err(|e| AppError::Gmail(format!("OAuth code exchange failed: {e}")))?;
    let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
        AppError::Gmail("Provider did not issue a refresh token".to_string())
    })?;

    let email_address = state
        .gmail
        .fetch_profile(&tokens.access_token)
        .await
        .map_err(|e| AppError::Gmail(format!("Failed to resolve mailbox address: {e}")))?;

    let expires_at = tokens
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs));
    let new_credential = NewCredential {
        user_id,
        email_address: &email_address,
        access_token: &tokens.access_token,
        refresh_token,
        token_type: tokens.token_type.as_deref().unwrap_or("Bearer"),
        scope: tokens.scope.as_deref().unwrap_or(""),
        expires_at,
    };

    // Reconnecting your own mailbox refreshes its tokens; a mailbox held by
    // anyone else is rejected. The unique index backs this check up.
    let credential = match credentials::find_by_address(&state.db, &email_address).await? {
        Some(existing) if existing.user_id == Some(user_id) => {
            credentials::replace_tokens(&state.db, existing.id, &new_credential).await?
        }
        Some(_) => {
            return Err(AppError::Conflict(format!(
                "Mailbox {email_address} is already connected"
            )));
        }
        None => credentials::insert(&state.db, &new_credential).await?,
    };

    tracing::info!(mailbox = %credential.email_address, "Gmail account connected");
    Ok(Json(json!({
        "success": true,
        "message": "Google OAuth successful. Gmail access granted.",
        "emailAddress": credential.email_address,
    })))
}

#[derive(Debug, Serialize)]
pub struct GmailAccount {
    pub id: Uuid,
    #[serde(rename = "emailAddress")]
    pub email_address: String,
    #[serde(rename = "isDefault")]
    pub is_default: bool,
    #[serde(rename = "isPreferred")]
    pub is_preferred: bool,
}

/// GET /auth/gmail/accounts
pub async fn gmail_accounts(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<GmailAccount>>, AppError> {
    let preferred: Option<(Option<Uuid>,)> =
        sqlx::query_as("SELECT preferred_credential_id FROM users WHERE id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.db)
            .await?;
    let preferred_id = preferred.and_then(|(id,)| id);

    let accounts = credentials::list_for_user(&state.db, user.user_id)
        .await?
        .into_iter()
        .map(|c: CredentialRow| GmailAccount {
            is_preferred: preferred_id == Some(c.id),
            id: c.id,
            email_address: c.email_address,
            is_default: c.is_default,
        })
        .collect();
    Ok(Json(accounts))
}

#[derive(Debug, Deserialize)]
pub struct SetPreferredRequest {
    #[serde(rename = "credentialId")]
    pub credential_id: Uuid,
}

/// POST /auth/gmail/preferred
pub async fn set_preferred_account(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SetPreferredRequest>,
) -> Result<Json<Value>, AppError> {
    let visible = credentials::list_for_user(&state.db, user.user_id).await?;
    let credential = visible
        .iter()
        .find(|c| c.id == req.credential_id)
        .ok_or_else(|| AppError::NotFound("Gmail account not found".to_string()))?;

    sqlx::query("UPDATE users SET preferred_credential_id = $2 WHERE id = $1")
        .bind(user.user_id)
        .bind(credential.id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({
        "success": true,
        "emailAddress": credential.email_address,
    })))
}

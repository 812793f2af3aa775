pub mod handlers;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::state::AppState;

/// Bearer token lifetime: 24 hours.
const TOKEN_TTL_SECS: i64 = 86_400;
/// OAuth `state` parameter lifetime: long enough to click through consent.
const STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Hash a password using argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Issue the session bearer token returned by `POST /auth/login`.
pub fn issue_token(user_id: Uuid, secret: &str) -> anyhow::Result<String> {
    encode_claims(user_id, secret, TOKEN_TTL_SECS)
}

/// Issue the short-lived token carried in the OAuth `state` parameter.
/// The Google callback arrives without a bearer header, so the state token
/// is what ties the redirect back to the user who requested it.
pub fn issue_state_token(user_id: Uuid, secret: &str) -> anyhow::Result<String> {
    encode_claims(user_id, secret, STATE_TTL_SECS)
}

fn encode_claims(user_id: Uuid, secret: &str, ttl_secs: i64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + ttl_secs,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to sign token: {e}"))
}

/// Validate a token and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Creates the bootstrap admin account on startup when ADMIN_EMAIL and
/// ADMIN_PASSWORD are set and no user with that email exists yet.
pub async fn ensure_admin_user(pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (
        config.admin_email.as_deref(),
        config.admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let name = config.admin_name.as_deref().unwrap_or("Administrator");
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role) VALUES ($1, $2, $3, $4, 'admin')",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(&password_hash)
    .execute(pool)
    .await?;

    tracing::info!(email, "bootstrap admin user created");
    Ok(())
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let claims = verify_token(token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("hunter2-but-longer").unwrap();
        assert!(verify_password("hunter2-but-longer", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "test-secret").unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let token = issue_token(Uuid::new_v4(), "secret-a").unwrap();
        assert!(verify_token(&token, "secret-b").is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_token("not.a.jwt", "secret").is_err());
    }
}

//! Mail client wrapper — the single point of entry for all Gmail REST calls.
//!
//! `GmailAuth` holds the OAuth client config; `client_for_user` resolves the
//! caller's credential once, refreshes it if needed, persists any rotated
//! tokens, and returns a `GmailClient` pinned to that account. Every mail
//! operation within one request uses the same resolved account.

pub mod types;

use base64::prelude::{Engine as _, BASE64_URL_SAFE, BASE64_URL_SAFE_NO_PAD};
use bytes::Bytes;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::credentials;
use crate::errors::AppError;
use crate::models::credential::CredentialRow;
use types::{AttachmentBody, Message, MessageList, MessageRef, Profile, TokenResponse};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const SCOPES: &str = "https://www.googleapis.com/auth/gmail.readonly \
                      https://www.googleapis.com/auth/gmail.modify \
                      https://www.googleapis.com/auth/gmail.send";

/// Access tokens within this window of expiry are refreshed up front rather
/// than risking a mid-batch 401.
const EXPIRY_SLACK_SECS: i64 = 60;
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum GmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gmail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Gmail response missing field: {0}")]
    MissingField(&'static str),
}

impl From<GmailError> for AppError {
    fn from(e: GmailError) -> Self {
        AppError::Gmail(e.to_string())
    }
}

/// OAuth client configuration plus the HTTP client shared by all Gmail calls.
#[derive(Clone)]
pub struct GmailAuth {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GmailAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
        }
    }

    /// Builds the Google consent URL. `state` round-trips through the
    /// provider and identifies the requesting user at callback time.
    pub fn consent_url(&self, state: &str) -> String {
        reqwest::Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .expect("consent URL is statically valid")
        .to_string()
    }

    /// Exchanges an authorization code for a token set.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GmailError> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .await
    }

    /// Trades a refresh token for a fresh access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, GmailError> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, GmailError> {
        let response = self.http.post(GOOGLE_TOKEN_URL).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GmailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Identifies which mailbox a token set belongs to.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<String, GmailError> {
        let response = self
            .http
            .get(format!("{GMAIL_API_BASE}/profile"))
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GmailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let profile: Profile = response.json().await?;
        Ok(profile.email_address)
    }

    /// Resolves the user's credential, silently refreshes it when close to
    /// expiry, persists rotated tokens, and returns a client pinned to that
    /// account for the rest of the request.
    pub async fn client_for_user(
        &self,
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<GmailClient, AppError> {
        let credential = credentials::resolve(pool, user_id).await?;
        let credential = self.ensure_fresh(pool, credential).await?;
        Ok(GmailClient {
            http: self.http.clone(),
            credential,
        })
    }

    async fn ensure_fresh(
        &self,
        pool: &PgPool,
        credential: CredentialRow,
    ) -> Result<CredentialRow, AppError> {
        let fresh = credential
            .expires_at
            .map(|at| at - Duration::seconds(EXPIRY_SLACK_SECS) > Utc::now())
            .unwrap_or(false);
        if fresh {
            return Ok(credential);
        }

        debug!(mailbox = %credential.email_address, "access token stale, refreshing");
        let tokens = self.refresh(&credential.refresh_token).await?;
        let expires_at = tokens.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));

        // Last-write-wins on the single credential row.
        let rotated = credentials::store_rotated_tokens(
            pool,
            credential.id,
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
            expires_at,
        )
        .await?;
        info!(mailbox = %rotated.email_address, "rotated tokens persisted");
        Ok(rotated)
    }
}

/// Authorized handle for one mailbox. Created per request; never cached
/// across requests or users.
pub struct GmailClient {
    http: Client,
    credential: CredentialRow,
}

impl GmailClient {
    /// The mailbox this client reads and sends as.
    pub fn email_address(&self) -> &str {
        &self.credential.email_address
    }

    /// Lists message refs matching a Gmail search query, following pagination.
    pub async fn list_messages(&self, query: &str) -> Result<Vec<MessageRef>, GmailError> {
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{GMAIL_API_BASE}/messages"))
                .bearer_auth(&self.credential.access_token)
                .query(&[("q", query)])
                .query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let page: MessageList = check_json(request.send().await?).await?;
            refs.extend(page.messages);

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(refs)
    }

    /// Fetches one message with full payload and headers.
    pub async fn get_message(&self, id: &str) -> Result<Message, GmailError> {
        let request = self
            .http
            .get(format!("{GMAIL_API_BASE}/messages/{id}"))
            .bearer_auth(&self.credential.access_token)
            .query(&[("format", "full")]);
        check_json(request.send().await?).await
    }

    /// Fetches and decodes one attachment's binary payload.
    pub async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Bytes, GmailError> {
        let request = self
            .http
            .get(format!(
                "{GMAIL_API_BASE}/messages/{message_id}/attachments/{attachment_id}"
            ))
            .bearer_auth(&self.credential.access_token);
        let body: AttachmentBody = check_json(request.send().await?).await?;
        let data = body.data.ok_or(GmailError::MissingField("data"))?;
        Ok(Bytes::from(decode_base64url(&data)?))
    }

    /// Clears the UNREAD label. Called only after an application has been
    /// persisted; a message that failed processing stays unread for retry.
    pub async fn mark_read(&self, id: &str) -> Result<(), GmailError> {
        let request = self
            .http
            .post(format!("{GMAIL_API_BASE}/messages/{id}/modify"))
            .bearer_auth(&self.credential.access_token)
            .json(&json!({ "removeLabelIds": ["UNREAD"] }));
        check_status(request.send().await?).await?;
        Ok(())
    }

    /// Sends a raw RFC 2822 message from this mailbox.
    pub async fn send_raw(&self, mime: &[u8]) -> Result<(), GmailError> {
        let request = self
            .http
            .post(format!("{GMAIL_API_BASE}/messages/send"))
            .bearer_auth(&self.credential.access_token)
            .json(&json!({ "raw": BASE64_URL_SAFE.encode(mime) }));
        check_status(request.send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GmailError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GmailError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

async fn check_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GmailError> {
    Ok(check_status(response).await?.json().await?)
}

/// Gmail emits base64url both with and without padding depending on the
/// endpoint; accept either.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64_URL_SAFE
        .decode(data)
        .or_else(|_| BASE64_URL_SAFE_NO_PAD.decode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64url_padded() {
        assert_eq!(decode_base64url("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_base64url_unpadded() {
        assert_eq!(decode_base64url("aGVsbG8").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_base64url_web_safe_alphabet() {
        // 0xfb 0xff encodes to "-_8" in the url-safe alphabet
        assert_eq!(decode_base64url("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_consent_url_carries_offline_access_and_state() {
        let auth = GmailAuth {
            http: Client::new(),
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
        };
        let url = auth.consent_url("state-token");
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("state=state-token"));
        assert!(url.contains("gmail.readonly"));
    }
}

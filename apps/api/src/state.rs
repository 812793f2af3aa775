use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::gmail::GmailAuth;
use crate::scoring::ResumeScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// OAuth client config and the HTTP client behind every Gmail call.
    /// Per-user mail handles are created from this per request; there is no
    /// process-global mail client.
    pub gmail: GmailAuth,
    /// Pluggable resume scorer. Default: OpenAiScorer.
    pub scorer: Arc<dyn ResumeScorer>,
    pub config: Config,
}

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub openai_api_key: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    /// Optional bootstrap admin account, created at startup if absent.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            google_client_id: require_env("GOOGLE_CLIENT_ID")?,
            google_client_secret: require_env("GOOGLE_CLIENT_SECRET")?,
            google_redirect_uri: require_env("GOOGLE_REDIRECT_URI")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            admin_email: std::env::var("ADMIN_EMAIL").ok(),
            admin_password: std::env::var("ADMIN_PASSWORD").ok(),
            admin_name: std::env::var("ADMIN_NAME").ok(),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

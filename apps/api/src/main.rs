mod applications;
mod auth;
mod config;
mod credentials;
mod db;
mod digest;
mod errors;
mod extract;
mod gmail;
mod ingest;
mod jobs;
mod models;
mod routes;
mod scoring;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::gmail::GmailAuth;
use crate::routes::build_router;
use crate::scoring::OpenAiScorer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hireline API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and run migrations
    let db = create_pool(&config.database_url).await?;

    // Seed the bootstrap admin account if configured
    auth::ensure_admin_user(&db, &config).await?;

    // OAuth client config for all Gmail access
    let gmail = GmailAuth::new(&config);
    info!("Gmail OAuth client initialized");

    // Initialize resume scorer
    let scorer = Arc::new(OpenAiScorer::new(config.openai_api_key.clone()));
    info!("Scoring client initialized (model: {})", scoring::MODEL);

    // Build app state
    let state = AppState {
        db,
        gmail,
        scorer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

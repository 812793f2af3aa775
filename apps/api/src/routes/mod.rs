pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::applications::handlers as application_handlers;
use crate::auth::handlers as auth_handlers;
use crate::jobs::handlers as job_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth + mailbox management
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/check", get(auth_handlers::check))
        .route("/auth/google/url", get(auth_handlers::google_auth_url))
        .route("/auth/google/callback", get(auth_handlers::google_callback))
        .route("/auth/gmail/accounts", get(auth_handlers::gmail_accounts))
        .route(
            "/auth/gmail/preferred",
            post(auth_handlers::set_preferred_account),
        )
        // Applications — static segments before parameterized ones
        .route(
            "/applications/fetch-emails",
            get(application_handlers::fetch_emails),
        )
        .route(
            "/applications/send-shortlisted",
            post(application_handlers::send_shortlisted),
        )
        .route("/applications", get(application_handlers::list_applications))
        .route(
            "/applications/:id",
            get(application_handlers::get_application)
                .delete(application_handlers::delete_application),
        )
        .route(
            "/applications/:id/shortlist",
            patch(application_handlers::toggle_shortlist),
        )
        .route(
            "/applications/:id/attachments/:attachment_id",
            get(application_handlers::download_attachment),
        )
        // Jobs
        .route(
            "/jobs",
            post(job_handlers::create_job).get(job_handlers::list_jobs),
        )
        .route(
            "/jobs/:id",
            get(job_handlers::get_job)
                .patch(job_handlers::update_job)
                .delete(job_handlers::delete_job),
        )
        .with_state(state)
}

pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ingestion::handlers as ingestion;
use crate::interview::handlers as interview;
use crate::results::handlers as results;
use crate::state::AppState;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Resume ingestion
        .route(
            "/api/v1/resumes",
            get(ingestion::handle_list_resumes).post(ingestion::handle_upload_resume),
        )
        .route("/api/v1/resumes/:id", get(ingestion::handle_get_resume))
        .route(
            "/api/v1/ingestions/:id",
            get(ingestion::handle_get_ingestion),
        )
        // Interview sessions
        .route(
            "/api/v1/sessions",
            get(interview::handle_list_sessions).post(interview::handle_create_session),
        )
        .route("/api/v1/sessions/:id", get(interview::handle_get_session))
        .route(
            "/api/v1/sessions/:id/start",
            post(interview::handle_start_session),
        )
        .route(
            "/api/v1/sessions/:id/end",
            post(interview::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/advance",
            post(interview::handle_advance_session),
        )
        .route(
            "/api/v1/questions/:id/response",
            post(interview::handle_submit_response),
        )
        // Results
        .route(
            "/api/v1/sessions/:id/results",
            get(results::handle_get_results),
        )
        .route("/api/v1/dashboard", get(results::handle_dashboard))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::customizer::handlers;
use crate::state::AppState;

/// Multipart framing and the tech-stack field on top of the document itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload = state.config.max_upload_bytes();
    // Oversized documents get through the transport cap and are rejected by upload
    // validation with a precise message; the cap only stops runaway bodies.
    let single_limit = upload.saturating_mul(2).saturating_add(MULTIPART_OVERHEAD);
    // Base64 grows payloads by a third.
    let batch_limit = (upload / 3 * 4 + MULTIPART_OVERHEAD).saturating_mul(state.config.max_batch_files.max(1));

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/customize",
            post(handlers::handle_customize).layer(DefaultBodyLimit::max(single_limit)),
        )
        .route(
            "/api/v1/customize/preview",
            post(handlers::handle_preview).layer(DefaultBodyLimit::max(single_limit)),
        )
        .route(
            "/api/v1/customize/batch",
            post(handlers::handle_batch).layer(DefaultBodyLimit::max(batch_limit)),
        )
        .with_state(state)
}

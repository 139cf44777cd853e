pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::generate::handlers;
use crate::state::AppState;

/// Multipart bodies may carry a 5 MiB resume or a full-size image; raise the
/// default 2 MB body cap and let the per-operation validators do the gating.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/generate-article", post(handlers::handle_generate_article))
        .route(
            "/generate-blog-titles",
            post(handlers::handle_generate_blog_titles),
        )
        .route("/generate-image", post(handlers::handle_generate_image))
        .route(
            "/remove-image-object",
            post(handlers::handle_remove_image_object),
        )
        .route("/resume-review", post(handlers::handle_resume_review))
        .route("/creations", get(handlers::handle_list_creations))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

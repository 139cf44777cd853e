//! Axum route handlers for the generation API.
//!
//! Handlers only translate the wire format: build the `GenerationRequest`
//! variant, hand it to the orchestrator, shape the JSON envelope. Every
//! endpoint answers `{success: ...}`, including the quota-exhausted case,
//! which is a 200 with `success: false` for callers expecting JSON-always.

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::creations::list_creations;
use crate::errors::AppError;
use crate::generate::{run, GenerationRequest, Outcome};
use crate::models::{Caller, CreationRow};
use crate::quota::LIMIT_REACHED_MESSAGE;
use crate::state::AppState;
use crate::upload::stage_upload;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub prompt: String,
    /// Max-token budget for the article; upstream default when omitted.
    pub length: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BlogTitlesRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub publish: bool,
}

/// Informational note for successful generations whose record insert failed.
const NOT_SAVED_MESSAGE: &str = "Image generated but could not save to database";

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl GenerateResponse {
    fn limit_reached() -> Self {
        Self {
            success: false,
            content: None,
            message: Some(LIMIT_REACHED_MESSAGE.to_string()),
            id: None,
            created_at: None,
        }
    }

    /// Content-only success envelope (record id stays internal).
    fn generated(content: String) -> Self {
        Self {
            success: true,
            content: Some(content),
            message: None,
            id: None,
            created_at: None,
        }
    }

    /// Success envelope including record metadata, when persistence landed.
    /// A missing record means the best-effort insert failed; the envelope says
    /// so without demoting the response to a failure.
    fn generated_with_meta(
        content: String,
        id: Option<Uuid>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        let message = id
            .is_none()
            .then(|| NOT_SAVED_MESSAGE.to_string());
        Self {
            success: true,
            content: Some(content),
            message,
            id,
            created_at,
        }
    }
}

fn content_response(outcome: Outcome) -> GenerateResponse {
    match outcome {
        Outcome::Generated { content, .. } => GenerateResponse::generated(content),
        Outcome::LimitReached => GenerateResponse::limit_reached(),
    }
}

#[derive(Debug, Serialize)]
pub struct CreationsResponse {
    pub success: bool,
    pub creations: Vec<CreationRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /generate-article
pub async fn handle_generate_article(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let outcome = run(
        &state,
        &caller,
        GenerationRequest::Article {
            prompt: request.prompt,
            length: request.length,
        },
    )
    .await?;
    Ok(Json(content_response(outcome)))
}

/// POST /generate-blog-titles
pub async fn handle_generate_blog_titles(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<BlogTitlesRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let outcome = run(
        &state,
        &caller,
        GenerationRequest::BlogTitles {
            prompt: request.prompt,
        },
    )
    .await?;
    Ok(Json(content_response(outcome)))
}

/// POST /generate-image
///
/// Success responses carry the persisted record's `id`/`createdAt` when the
/// best-effort insert landed.
pub async fn handle_generate_image(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ImageRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let outcome = run(
        &state,
        &caller,
        GenerationRequest::Image {
            prompt: request.prompt,
            publish: request.publish,
        },
    )
    .await?;
    let response = match outcome {
        Outcome::Generated {
            content,
            id,
            created_at,
        } => GenerateResponse::generated_with_meta(content, id, created_at),
        Outcome::LimitReached => GenerateResponse::limit_reached(),
    };
    Ok(Json(response))
}

/// POST /remove-image-object
///
/// Multipart body: file field `image`, text field `object`.
pub async fn handle_remove_image_object(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    let (upload, fields) = stage_upload(&mut multipart, "image").await?;
    let object = fields.get("object").cloned().unwrap_or_default();

    let outcome = run(
        &state,
        &caller,
        GenerationRequest::RemoveObject { object, upload },
    )
    .await?;
    Ok(Json(content_response(outcome)))
}

/// POST /resume-review
///
/// Multipart body: file field `resume`.
pub async fn handle_resume_review(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    let (upload, _) = stage_upload(&mut multipart, "resume").await?;

    let outcome = run(&state, &caller, GenerationRequest::ResumeReview { upload }).await?;
    Ok(Json(content_response(outcome)))
}

/// GET /creations
///
/// The caller's persisted artifacts, newest first.
pub async fn handle_list_creations(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<CreationsResponse>, AppError> {
    let creations = list_creations(&state.db, &caller.user_id).await?;
    Ok(Json(CreationsResponse {
        success: true,
        creations,
    }))
}

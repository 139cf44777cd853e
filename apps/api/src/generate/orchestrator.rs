//! Artifact Request Orchestrator.
//!
//! Every generation operation runs through `run` with the same skeleton:
//! capability gate → quota gate → input validation → upstream call(s) →
//! best-effort persistence → usage increment → response. Gates and validation
//! all fire before any upstream call; persistence and usage-increment failures
//! are logged and swallowed, never surfaced (the generated artifact is still
//! returned to the caller).

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::assets::GENERATED_IMAGES_FOLDER;
use crate::clients::chat::ChatError;
use crate::clients::image_gen::ImageGenError;
use crate::clients::prompts::{RESUME_REVIEW_PROMPT_PREFIX, RESUME_REVIEW_RECORD_PROMPT};
use crate::creations::insert_creation;
use crate::errors::AppError;
use crate::models::Caller;
use crate::quota::free_tier_allows;
use crate::state::AppState;
use crate::upload::{has_pdf_magic, StagedUpload, MAX_RESUME_BYTES};

const BLOG_TITLES_MAX_TOKENS: u32 = 100;
const RESUME_REVIEW_MAX_TOKENS: u32 = 1000;
/// Minimum extracted resume text length after trimming.
const MIN_RESUME_TEXT_CHARS: usize = 10;

/// One inbound generation request, built by a route handler and discarded
/// after the call completes. Staged uploads ride along and are released when
/// the variant is dropped, whichever exit path is taken.
#[derive(Debug)]
pub enum GenerationRequest {
    Article {
        prompt: String,
        length: Option<u32>,
    },
    BlogTitles {
        prompt: String,
    },
    Image {
        prompt: String,
        /// Accepted for caller compatibility; not gated on and not persisted.
        publish: bool,
    },
    RemoveObject {
        object: String,
        upload: Option<StagedUpload>,
    },
    ResumeReview {
        upload: Option<StagedUpload>,
    },
}

impl GenerationRequest {
    /// Premium-only operations fail with a capability error for free callers;
    /// no quota counting applies to them.
    fn premium_only(&self) -> bool {
        matches!(
            self,
            GenerationRequest::Image { .. }
                | GenerationRequest::RemoveObject { .. }
                | GenerationRequest::ResumeReview { .. }
        )
    }

    /// Usage-gated operations consume one unit of the free-tier quota.
    fn usage_gated(&self) -> bool {
        matches!(
            self,
            GenerationRequest::Article { .. } | GenerationRequest::BlogTitles { .. }
        )
    }

    /// Type tag recorded against the persisted creation.
    fn creation_type(&self) -> &'static str {
        match self {
            GenerationRequest::Article { .. } => "article",
            GenerationRequest::BlogTitles { .. } => "blog_title",
            GenerationRequest::Image { .. } => "image",
            // Object removal records as an image creation, matching the
            // dashboard's type filter.
            GenerationRequest::RemoveObject { .. } => "image",
            GenerationRequest::ResumeReview { .. } => "resume-review",
        }
    }
}

/// Result of a generation operation. `LimitReached` is a normal outcome, not
/// an error: it serializes as HTTP 200 with `success: false` for callers that
/// expect a JSON body on every request.
#[derive(Debug)]
pub enum Outcome {
    Generated {
        content: String,
        id: Option<Uuid>,
        created_at: Option<DateTime<Utc>>,
    },
    LimitReached,
}

#[derive(Debug, PartialEq, Eq)]
enum Gate {
    Allowed,
    LimitReached,
}

/// Single dispatch entry point for all five operation types.
pub async fn run(
    state: &AppState,
    caller: &Caller,
    request: GenerationRequest,
) -> Result<Outcome, AppError> {
    match preflight(caller, &request)? {
        Gate::LimitReached => return Ok(Outcome::LimitReached),
        Gate::Allowed => {}
    }

    let dev = state.config.is_development();
    let creation_type = request.creation_type();

    // Upstream call(s), awaited sequentially. Everything past this match is
    // the shared persist / increment / respond tail.
    let (record_prompt, content) = match &request {
        GenerationRequest::Article { prompt, length } => {
            let content = state
                .chat
                .complete(prompt.trim(), *length)
                .await
                .map_err(|e| map_chat_error(e, dev))?;
            (prompt.trim().to_string(), content)
        }
        GenerationRequest::BlogTitles { prompt } => {
            let content = state
                .chat
                .complete(prompt.trim(), Some(BLOG_TITLES_MAX_TOKENS))
                .await
                .map_err(|e| map_chat_error(e, dev))?;
            (prompt.trim().to_string(), content)
        }
        GenerationRequest::Image { prompt, publish } => {
            let prompt = prompt.trim();
            info!(publish = *publish, "Generating image");
            let image = state
                .image_gen
                .generate(prompt)
                .await
                .map_err(|e| map_image_gen_error(e, dev))?;
            let url = state
                .assets
                .upload_image_bytes(image, GENERATED_IMAGES_FOLDER)
                .await
                .map_err(|e| {
                    upstream_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Error processing the generated image. Please try again.",
                        e.to_string(),
                        dev,
                    )
                })?;
            (prompt.to_string(), url)
        }
        GenerationRequest::RemoveObject { object, upload } => {
            // Presence was checked in preflight.
            let upload = upload
                .as_ref()
                .ok_or_else(|| AppError::Validation("No image file provided".to_string()))?;
            let bytes = upload
                .read()
                .map_err(|e| anyhow::anyhow!("Failed to read staged image: {e}"))?;
            let url = state
                .assets
                .upload_with_object_removal(bytes, object)
                .await
                .map_err(|e| {
                    upstream_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to process image. Please try again later.",
                        e.to_string(),
                        dev,
                    )
                })?;
            (format!("Remove {} from image", object.trim()), url)
        }
        GenerationRequest::ResumeReview { upload } => {
            let upload = upload
                .as_ref()
                .ok_or_else(|| AppError::Validation("No resume file provided".to_string()))?;
            let bytes = upload
                .read()
                .map_err(|e| anyhow::anyhow!("Failed to read staged resume: {e}"))?;
            let text = extract_resume_text(&bytes)?;
            let prompt = format!("{RESUME_REVIEW_PROMPT_PREFIX}{text}");
            let content = state
                .chat
                .complete(&prompt, Some(RESUME_REVIEW_MAX_TOKENS))
                .await
                .map_err(|e| map_chat_error(e, dev))?;
            (RESUME_REVIEW_RECORD_PROMPT.to_string(), content)
        }
    };

    // Best-effort persistence: a failed insert is logged, the artifact is
    // still returned. Deliberate policy, do not upgrade to a hard failure.
    let persisted = match insert_creation(
        &state.db,
        &caller.user_id,
        &record_prompt,
        &content,
        creation_type,
    )
    .await
    {
        Ok(row) => Some(row),
        Err(e) => {
            warn!(
                user_id = %caller.user_id,
                creation_type,
                "Failed to persist creation record: {e}"
            );
            None
        }
    };

    // Usage counts only after the upstream call succeeded, and only for
    // usage-gated operations by free callers.
    if request.usage_gated() && !caller.plan.is_premium() {
        if let Err(e) = state
            .identity
            .set_free_usage(&caller.user_id, caller.free_usage + 1)
            .await
        {
            warn!(user_id = %caller.user_id, "Failed to increment free usage: {e}");
        }
    }

    info!(user_id = %caller.user_id, creation_type, "Generation succeeded");

    Ok(Outcome::Generated {
        content,
        id: persisted.as_ref().map(|row| row.id),
        created_at: persisted.as_ref().map(|row| row.created_at),
    })
}

/// Gates and validation that run before any upstream call. Pure with respect
/// to the network: reads only the caller snapshot and the request itself.
fn preflight(caller: &Caller, request: &GenerationRequest) -> Result<Gate, AppError> {
    if request.premium_only() && !caller.plan.is_premium() {
        return Err(AppError::PremiumRequired);
    }

    if request.usage_gated() && !free_tier_allows(caller.plan, caller.free_usage) {
        return Ok(Gate::LimitReached);
    }

    match request {
        GenerationRequest::Article { prompt, .. }
        | GenerationRequest::BlogTitles { prompt }
        | GenerationRequest::Image { prompt, .. } => {
            require_prompt(prompt)?;
        }
        GenerationRequest::RemoveObject { object, upload } => {
            if object.trim().is_empty() {
                return Err(AppError::Validation(
                    "Please provide the object to remove".to_string(),
                ));
            }
            if upload.is_none() {
                return Err(AppError::Validation("No image file provided".to_string()));
            }
        }
        GenerationRequest::ResumeReview { upload } => {
            let upload = upload
                .as_ref()
                .ok_or_else(|| AppError::Validation("No resume file provided".to_string()))?;
            upload.require_max_size(MAX_RESUME_BYTES)?;
        }
    }

    Ok(Gate::Allowed)
}

fn require_prompt(prompt: &str) -> Result<(), AppError> {
    if prompt.trim().is_empty() {
        return Err(AppError::Validation(
            "Please provide a valid prompt".to_string(),
        ));
    }
    Ok(())
}

/// Validates the PDF signature and pulls the text out of the resume bytes.
/// Runs entirely before the chat call.
fn extract_resume_text(bytes: &[u8]) -> Result<String, AppError> {
    if !has_pdf_magic(bytes) {
        return Err(AppError::Validation(
            "The uploaded file is not a valid PDF. Please upload a valid PDF file.".to_string(),
        ));
    }

    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        AppError::Validation(format!(
            "Failed to parse PDF: {e}. Please ensure the file is not password protected and is a valid PDF."
        ))
    })?;

    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_RESUME_TEXT_CHARS {
        return Err(AppError::Validation(
            "The PDF appears to be empty or contains no extractable text. Please try with a different PDF."
                .to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Maps chat-completion failures to caller-safe errors. Upstream 401/402 pass
/// their status through; everything else is a generic 500.
fn map_chat_error(error: ChatError, dev: bool) -> AppError {
    let detail = error.to_string();
    match error.status() {
        Some(401) => upstream_error(
            StatusCode::UNAUTHORIZED,
            "Invalid API key for AI service.",
            detail,
            dev,
        ),
        Some(402) => upstream_error(
            StatusCode::PAYMENT_REQUIRED,
            "AI service quota exceeded. Please try again later.",
            detail,
            dev,
        ),
        _ => upstream_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An AI processing error occurred. Please try again later.",
            detail,
            dev,
        ),
    }
}

fn map_image_gen_error(error: ImageGenError, dev: bool) -> AppError {
    let detail = error.to_string();
    if error.is_timeout() {
        return upstream_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Image generation request timed out. Please try again.",
            detail,
            dev,
        );
    }
    match error.status() {
        Some(401) => upstream_error(
            StatusCode::UNAUTHORIZED,
            "Invalid API key for image generation service.",
            detail,
            dev,
        ),
        Some(402) => upstream_error(
            StatusCode::PAYMENT_REQUIRED,
            "Image generation service quota exceeded. Please try again later.",
            detail,
            dev,
        ),
        _ => upstream_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate image. Please try again later.",
            detail,
            dev,
        ),
    }
}

/// Raw upstream detail only leaves the process in development mode.
fn upstream_error(status: StatusCode, message: &str, detail: String, dev: bool) -> AppError {
    AppError::Upstream {
        status,
        message: message.to_string(),
        detail: dev.then_some(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Plan;
    use crate::quota::FREE_TIER_LIMIT;

    fn caller(plan: Plan, free_usage: u32) -> Caller {
        Caller {
            user_id: "user_123".to_string(),
            plan,
            free_usage,
        }
    }

    fn staged_pdf(bytes: &[u8]) -> StagedUpload {
        StagedUpload::from_bytes(
            bytes,
            Some("resume.pdf".to_string()),
            Some("application/pdf".to_string()),
        )
        .unwrap()
    }

    fn article(prompt: &str) -> GenerationRequest {
        GenerationRequest::Article {
            prompt: prompt.to_string(),
            length: Some(500),
        }
    }

    #[test]
    fn free_caller_below_limit_passes_quota_gate() {
        let gate = preflight(&caller(Plan::Free, FREE_TIER_LIMIT - 1), &article("haiku")).unwrap();
        assert_eq!(gate, Gate::Allowed);
    }

    #[test]
    fn free_caller_at_limit_is_denied_without_error() {
        let gate = preflight(&caller(Plan::Free, FREE_TIER_LIMIT), &article("haiku")).unwrap();
        assert_eq!(gate, Gate::LimitReached);
    }

    #[test]
    fn premium_caller_skips_quota_gate() {
        let gate = preflight(&caller(Plan::Premium, 99), &article("haiku")).unwrap();
        assert_eq!(gate, Gate::Allowed);
    }

    #[test]
    fn blog_titles_are_usage_gated() {
        let request = GenerationRequest::BlogTitles {
            prompt: "rust blogs".to_string(),
        };
        let gate = preflight(&caller(Plan::Free, FREE_TIER_LIMIT), &request).unwrap();
        assert_eq!(gate, Gate::LimitReached);
    }

    #[test]
    fn premium_only_operations_reject_free_callers() {
        let requests = [
            GenerationRequest::Image {
                prompt: "a cat".to_string(),
                publish: false,
            },
            GenerationRequest::RemoveObject {
                object: "car".to_string(),
                upload: None,
            },
            GenerationRequest::ResumeReview { upload: None },
        ];
        for request in requests {
            let result = preflight(&caller(Plan::Free, 0), &request);
            assert!(matches!(result, Err(AppError::PremiumRequired)));
        }
    }

    #[test]
    fn capability_gate_fires_before_validation() {
        // Free caller with a missing upload: capability denial wins.
        let request = GenerationRequest::ResumeReview { upload: None };
        let result = preflight(&caller(Plan::Free, 0), &request);
        assert!(matches!(result, Err(AppError::PremiumRequired)));
    }

    #[test]
    fn blank_prompt_is_a_validation_error() {
        let result = preflight(&caller(Plan::Free, 0), &article("   "));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn missing_resume_file_is_a_validation_error() {
        let request = GenerationRequest::ResumeReview { upload: None };
        let result = preflight(&caller(Plan::Premium, 0), &request);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn oversized_resume_is_rejected_before_parsing() {
        let big = staged_pdf(&vec![b'a'; (MAX_RESUME_BYTES + 1) as usize]);
        let oversized = GenerationRequest::ResumeReview { upload: Some(big) };
        assert!(matches!(
            preflight(&caller(Plan::Premium, 0), &oversized),
            Err(AppError::Validation(_))
        ));

        let small = GenerationRequest::ResumeReview {
            upload: Some(staged_pdf(b"%PDF-1.4 small file")),
        };
        assert_eq!(
            preflight(&caller(Plan::Premium, 0), &small).unwrap(),
            Gate::Allowed
        );
    }

    #[test]
    fn staged_file_is_released_when_request_is_dropped() {
        let staged = staged_pdf(b"not a pdf at all");
        let path = staged.path().to_path_buf();
        let request = GenerationRequest::ResumeReview {
            upload: Some(staged),
        };
        assert!(path.exists());
        drop(request);
        assert!(!path.exists());
    }

    #[test]
    fn missing_object_label_is_a_validation_error() {
        let request = GenerationRequest::RemoveObject {
            object: "  ".to_string(),
            upload: Some(staged_pdf(b"fake image bytes")),
        };
        assert!(matches!(
            preflight(&caller(Plan::Premium, 0), &request),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn non_pdf_bytes_are_rejected_before_extraction() {
        let result = extract_resume_text(b"PK\x03\x04 definitely a zip");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn creation_types_match_the_dashboard_tags() {
        assert_eq!(article("x").creation_type(), "article");
        assert_eq!(
            GenerationRequest::BlogTitles {
                prompt: "x".to_string()
            }
            .creation_type(),
            "blog_title"
        );
        assert_eq!(
            GenerationRequest::ResumeReview { upload: None }.creation_type(),
            "resume-review"
        );
        assert_eq!(
            GenerationRequest::RemoveObject {
                object: "car".to_string(),
                upload: None
            }
            .creation_type(),
            "image"
        );
    }

    #[test]
    fn usage_gating_matches_operation_class() {
        assert!(article("x").usage_gated());
        assert!(!article("x").premium_only());
        let image = GenerationRequest::Image {
            prompt: "x".to_string(),
            publish: true,
        };
        assert!(image.premium_only());
        assert!(!image.usage_gated());
    }

    // End-to-end runs against in-process upstreams: a chat endpoint that
    // always answers, a usage endpoint that records every write, and a pool
    // pointed at a closed port so every insert fails.

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;

    use crate::clients::assets::AssetClient;
    use crate::clients::chat::ChatClient;
    use crate::clients::identity::IdentityClient;
    use crate::clients::image_gen::ImageGenClient;
    use crate::config::Config;

    type UsageWrites = Arc<Mutex<Vec<(String, u32)>>>;

    async fn spawn_upstreams(writes: UsageWrites) -> std::net::SocketAddr {
        async fn chat_completions() -> axum::Json<serde_json::Value> {
            axum::Json(serde_json::json!({
                "choices": [{"message": {"content": "Rivers carve the stone"}}]
            }))
        }

        async fn record_usage(
            axum::extract::State(writes): axum::extract::State<UsageWrites>,
            axum::extract::Path(user_id): axum::extract::Path<String>,
            axum::Json(body): axum::Json<serde_json::Value>,
        ) -> axum::Json<serde_json::Value> {
            let free_usage = body["free_usage"].as_u64().unwrap() as u32;
            writes.lock().unwrap().push((user_id, free_usage));
            axum::Json(serde_json::json!({"success": true}))
        }

        let app = axum::Router::new()
            .route("/chat/completions", axum::routing::post(chat_completions))
            .route("/users/:id/free-usage", axum::routing::post(record_usage))
            .with_state(writes);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn state_with_dead_db(addr: std::net::SocketAddr) -> AppState {
        let base = format!("http://{addr}");
        let config = Config::for_tests();
        AppState {
            // connect_lazy against a closed port: the pool builds fine, every
            // acquire fails. Short timeout keeps the tests fast.
            db: PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Duration::from_millis(200))
                .connect_lazy(&config.database_url)
                .unwrap(),
            chat: ChatClient::new(base.clone(), "test-key".to_string()),
            image_gen: ImageGenClient::new(format!("{base}/text-to-image"), "test-key".to_string())
                .unwrap(),
            assets: AssetClient::new(
                base.clone(),
                "test-cloud".to_string(),
                "test-key".to_string(),
                "test-secret".to_string(),
            ),
            identity: IdentityClient::new(base, "test-key".to_string()),
            config,
        }
    }

    #[tokio::test]
    async fn article_survives_persistence_failure_and_counts_usage_once() {
        let writes = UsageWrites::default();
        let addr = spawn_upstreams(writes.clone()).await;
        let state = state_with_dead_db(addr);

        let outcome = run(&state, &caller(Plan::Free, 9), article("a river haiku"))
            .await
            .unwrap();

        match outcome {
            Outcome::Generated {
                content,
                id,
                created_at,
            } => {
                assert_eq!(content, "Rivers carve the stone");
                // Insert failed against the dead pool; meta absent, artifact kept.
                assert!(id.is_none());
                assert!(created_at.is_none());
            }
            Outcome::LimitReached => panic!("expected a generated artifact"),
        }

        // Exactly one usage write, carrying the incremented counter.
        let recorded = writes.lock().unwrap().clone();
        assert_eq!(recorded, vec![("user_123".to_string(), 10)]);
    }

    #[tokio::test]
    async fn premium_article_leaves_usage_counter_untouched() {
        let writes = UsageWrites::default();
        let addr = spawn_upstreams(writes.clone()).await;
        let state = state_with_dead_db(addr);

        let outcome = run(&state, &caller(Plan::Premium, 3), article("a river haiku"))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Generated { .. }));
        assert!(writes.lock().unwrap().is_empty());
    }
}

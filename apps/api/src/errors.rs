use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Quota exhaustion is deliberately NOT an error: the limit-reached case is a
/// normal 200 response with `success: false` (see `generate::Outcome`), kept
/// for callers that expect a JSON body on every request.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("This feature is only available in premium subscription")]
    PremiumRequired,

    #[error("Validation error: {0}")]
    Validation(String),

    /// Upstream service failure. `status` is the HTTP status we surface
    /// (401/402 pass through from upstream auth/quota signals, 500 otherwise);
    /// `message` is a fixed safe string; `detail` carries raw upstream text and
    /// is only populated in development mode.
    #[error("Upstream error: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        detail: Option<String>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Generic upstream failure surfaced as a 500 with a safe message.
    pub fn upstream(message: impl Into<String>) -> Self {
        AppError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            detail: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
                None,
            ),
            AppError::PremiumRequired => (
                StatusCode::FORBIDDEN,
                "This feature is only available in premium subscription".to_string(),
                None,
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Upstream {
                status,
                message,
                detail,
            } => {
                tracing::error!("Upstream error ({status}): {message}");
                (status, message, detail)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let body = match detail {
            Some(detail) => Json(json!({
                "success": false,
                "message": message,
                "error": detail,
            })),
            None => Json(json!({
                "success": false,
                "message": message,
            })),
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn premium_required_maps_to_403() {
        let response = AppError::PremiumRequired.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_maps_to_400() {
        let response = AppError::Validation("bad prompt".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_passes_status_through() {
        let response = AppError::Upstream {
            status: StatusCode::PAYMENT_REQUIRED,
            message: "quota exceeded".to_string(),
            detail: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn generic_upstream_maps_to_500() {
        let response = AppError::upstream("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

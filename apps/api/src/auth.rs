//! Caller extraction.
//!
//! Authentication itself happens upstream: the gateway verifies the session
//! token and forwards the resolved identity, plan, and free-usage counter as
//! request headers. This module only reads them back out; it is the boundary
//! to the external identity collaborator, not an auth implementation.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};

use crate::errors::AppError;
use crate::models::{Caller, Plan};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const PLAN_HEADER: &str = "x-user-plan";
pub const FREE_USAGE_HEADER: &str = "x-free-usage";

/// Builds a `Caller` from gateway headers.
/// Missing or empty user id → 401. Plan defaults to free, usage to 0.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AppError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AppError::Unauthorized)?
        .to_string();

    let plan = headers
        .get(PLAN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(Plan::parse)
        .unwrap_or(Plan::Free);

    let free_usage = headers
        .get(FREE_USAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0);

    Ok(Caller {
        user_id,
        plan,
        free_usage,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
    }
}

//! Entry check shared by every protected handler.
//!
//! Flow Overview: read the token from the `token` query parameter (or a
//! bearer header), run it through the session validator, and hand the token
//! back so the handler can continue. A failed check ends the request with a
//! `400` before the wrapped operation runs.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Deserialize;

use crate::{api::error::ApiError, session::SessionValidator};

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Validate the presented token and return it.
///
/// # Errors
/// `ApiError::Client` when the token is missing or unknown,
/// `ApiError::Internal` when the store cannot be read.
pub async fn require_session(
    validator: &SessionValidator,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<String, ApiError> {
    let token = presented_token(headers, query_token).unwrap_or_default();
    validator.validate(&token).await?;
    Ok(token)
}

/// Query parameter first, then `Authorization: Bearer`.
fn presented_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    match query_token {
        Some(token) if !token.is_empty() => Some(token.to_string()),
        _ => extract_bearer_token(headers),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

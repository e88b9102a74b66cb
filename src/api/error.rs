//! Error responses. Every failure renders as `{"error": "<message>"}`.

use crate::{
    debug::DebugError,
    github::ProviderError,
    session::{IssueError, ValidationError},
};
use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing parameter, bad token, malformed request.
    #[error("{0}")]
    Client(String),
    /// Storage, serialization, provider or downstream failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client(message.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Client(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Client(message) => message,
            Self::Internal(message) => {
                error!("{message}");
                message
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        if err.is_client_error() {
            Self::client(err.to_string())
        } else {
            Self::internal(err)
        }
    }
}

/// Malformed query strings are client errors with axum's message.
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::client(rejection.body_text())
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        Self::internal(err)
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self::internal(err)
    }
}

impl From<DebugError> for ApiError {
    fn from(err: DebugError) -> Self {
        Self::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StoreError;

    #[test]
    fn validation_errors_map_to_taxonomy() {
        assert_eq!(
            ApiError::from(ValidationError::Missing).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ValidationError::NotLoggedIn).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ValidationError::Store(StoreError::Unavailable(
                "down".to_string()
            )))
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_error_keeps_message() {
        let err = ApiError::from(ValidationError::Missing);
        assert_eq!(err.to_string(), "Token missing");
    }

    #[test]
    fn issue_errors_are_internal() {
        let err = ApiError::from(IssueError::Persist(StoreError::Unavailable(
            "down".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn into_response_sets_status() {
        let response = ApiError::client("Service missing").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

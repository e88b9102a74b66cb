//! Read-only proxies to the debug backend.

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::HeaderMap,
    Json,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::gateway::{require_session, TokenQuery};
use crate::api::{
    error::{ApiError, ErrorBody},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ServiceQuery {
    pub token: Option<String>,
    pub service: Option<String>,
}

/// Any registered name is accepted; control characters are not.
pub fn valid_service_name(name: &str) -> bool {
    Regex::new(r"^[^\p{Cc}]+$").is_ok_and(|re| re.is_match(name))
}

fn required_service(service: Option<&str>) -> Result<&str, ApiError> {
    match service {
        None | Some("") => Err(ApiError::client("Service missing")),
        Some(name) if !valid_service_name(name) => Err(ApiError::client("Invalid service name")),
        Some(name) => Ok(name),
    }
}

#[utoipa::path(
    get,
    path = "/v1/services",
    params(
        ("token" = Option<String>, Query, description = "Session token")
    ),
    responses(
        (status = 200, description = "Registered services with their nodes"),
        (status = 400, description = "Token missing or not logged in", body = ErrorBody),
        (status = 500, description = "Registry lookup failed", body = ErrorBody)
    ),
    tag = "debug"
)]
pub async fn services(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let Query(query) = query?;
    require_session(state.validator(), &headers, query.token.as_deref()).await?;
    Ok(Json(state.debug().list_services().await?))
}

#[utoipa::path(
    get,
    path = "/v1/service/logs",
    params(
        ("token" = Option<String>, Query, description = "Session token"),
        ("service" = String, Query, description = "Service name")
    ),
    responses(
        (status = 200, description = "Log records for the service"),
        (status = 400, description = "Token or service missing", body = ErrorBody),
        (status = 500, description = "Debug service failure", body = ErrorBody)
    ),
    tag = "debug"
)]
pub async fn logs(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ServiceQuery>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let Query(query) = query?;
    require_session(state.validator(), &headers, query.token.as_deref()).await?;
    let service = required_service(query.service.as_deref())?;
    Ok(Json(state.debug().read_logs(service).await?))
}

#[utoipa::path(
    get,
    path = "/v1/service/stats",
    params(
        ("token" = Option<String>, Query, description = "Session token"),
        ("service" = String, Query, description = "Service name")
    ),
    responses(
        (status = 200, description = "Stats snapshots for the service"),
        (status = 400, description = "Token or service missing", body = ErrorBody),
        (status = 500, description = "Debug service failure", body = ErrorBody)
    ),
    tag = "debug"
)]
pub async fn stats(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ServiceQuery>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let Query(query) = query?;
    require_session(state.validator(), &headers, query.token.as_deref()).await?;
    let service = required_service(query.service.as_deref())?;
    Ok(Json(state.debug().read_stats(service).await?))
}

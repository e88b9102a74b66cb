use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use super::gateway::{require_session, TokenQuery};
use crate::{
    api::{
        error::{ApiError, ErrorBody},
        state::AppState,
    },
    session::UserRecord,
};

#[utoipa::path(
    get,
    path = "/v1/user",
    params(
        ("token" = Option<String>, Query, description = "Session token")
    ),
    responses(
        (status = 200, description = "The logged-in user", body = UserRecord),
        (status = 400, description = "Token missing or not logged in", body = ErrorBody),
        (status = 500, description = "Session store failure", body = ErrorBody)
    ),
    tag = "session"
)]
pub async fn user(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<UserRecord>, ApiError> {
    let Query(query) = query?;
    let token = require_session(state.validator(), &headers, query.token.as_deref()).await?;
    let user = state.validator().current_user(&token).await?;
    Ok(Json(user))
}

//! GitHub login endpoints.
//!
//! Flow Overview:
//! 1) `/v1/github/login` stores a random OAuth `state` in a short-lived cookie
//!    and redirects to GitHub.
//! 2) `/v1/auth/verify` checks the `state`, exchanges the code, reads the user
//!    and asks for their team membership.
//! 3) Active members get a session token in the `token` cookie and land on the
//!    frontend; everyone else is sent to `<frontend>/not-invited`.

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::{
        header::{InvalidHeaderValue, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

use crate::{
    api::{
        error::{ApiError, ErrorBody},
        state::{AppConfig, AppState},
    },
    session::{random_token, IssueError, MembershipState},
};

pub const SESSION_COOKIE_NAME: &str = "token";
pub const STATE_COOKIE_NAME: &str = "dashgate_oauth_state";
const STATE_COOKIE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

enum LoginOutcome {
    Issued(String),
    NotInvited,
}

#[utoipa::path(
    get,
    path = "/v1/github/login",
    responses(
        (status = 302, description = "Redirect to the GitHub authorization page"),
        (status = 500, description = "Authorization URL could not be built", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(Extension(state): Extension<Arc<AppState>>) -> Result<Response, ApiError> {
    let oauth_state = random_token().map_err(ApiError::internal)?;
    let url = state.identity().authorize_url(&oauth_state)?;
    let cookie = state_cookie(state.config(), &oauth_state).map_err(ApiError::internal)?;
    found(url.as_str(), [cookie])
}

#[utoipa::path(
    get,
    path = "/v1/auth/verify",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from GitHub"),
        ("state" = Option<String>, Query, description = "OAuth state echoed by GitHub")
    ),
    responses(
        (status = 302, description = "Session issued, or redirect to the not-invited page"),
        (status = 400, description = "Invalid callback", body = ErrorBody),
        (status = 500, description = "Provider or session store failure", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let config = state.config();
    let clear_state = clear_state_cookie(config).map_err(ApiError::internal)?;

    match complete_login(&state, &headers, query).await? {
        LoginOutcome::Issued(token) => {
            let cookie = session_cookie(config, &token).map_err(|err| {
                warn!("Failed to build session cookie: {err}");
                ApiError::internal(err)
            })?;
            found(config.landing_url(), [cookie, clear_state])
        }
        LoginOutcome::NotInvited => found(&config.not_invited_url(), [clear_state]),
    }
}

#[instrument(skip_all)]
async fn complete_login(
    state: &AppState,
    headers: &HeaderMap,
    query: CallbackQuery,
) -> Result<LoginOutcome, ApiError> {
    if let Some(error) = query.error {
        let message = query
            .error_description
            .map_or_else(|| error.clone(), |desc| format!("{error}: {desc}"));
        return Err(ApiError::client(message));
    }

    let expected = read_cookie(headers, STATE_COOKIE_NAME);
    match (expected.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received => {}
        _ => return Err(ApiError::client("Invalid OAuth state")),
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::client("Code missing"))?;

    let access_token = state.identity().exchange_code(&code).await?;
    let identity = state.identity().identity(&access_token).await?;

    // Lookup failures count as "not a member".
    let membership = match state
        .membership()
        .membership(&access_token, &identity.login)
        .await
    {
        Ok(membership) => membership,
        Err(err) => {
            warn!(login = %identity.login, "membership lookup failed: {err}");
            MembershipState::Unknown(err.to_string())
        }
    };

    match state.issuer().issue(&identity, &membership).await {
        Ok(token) => {
            info!(login = %identity.login, "session issued");
            Ok(LoginOutcome::Issued(token))
        }
        Err(IssueError::NotAuthorized) => {
            info!(login = %identity.login, ?membership, "login refused, not invited");
            Ok(LoginOutcome::NotInvited)
        }
        Err(err) => Err(err.into()),
    }
}

/// `302 Found` to `location`, setting each cookie.
fn found(
    location: &str,
    cookies: impl IntoIterator<Item = HeaderValue>,
) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(location).map_err(ApiError::internal)?;
    headers.insert(LOCATION, location);
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
    Ok((StatusCode::FOUND, headers).into_response())
}

/// Cookie delivering a fresh session token. Readable by the frontend, which
/// keeps the token after the cookie expires.
fn session_cookie(config: &AppConfig, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.cookie_ttl().as_secs();
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; Max-Age={max_age}; SameSite=Lax");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn state_cookie(config: &AppConfig, oauth_state: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = STATE_COOKIE_TTL.as_secs();
    let mut cookie =
        format!("{STATE_COOKIE_NAME}={oauth_state}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_state_cookie(config: &AppConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{STATE_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_root_scoped_for_one_day() {
        let config = AppConfig::new("https://dash.example.test".to_string());
        let cookie = session_cookie(&config, "abc123");
        assert_eq!(
            cookie.ok().as_ref().and_then(|v| v.to_str().ok()),
            Some("token=abc123; Path=/; Max-Age=86400; SameSite=Lax; Secure")
        );
    }

    #[test]
    fn state_cookie_is_http_only() {
        let config = AppConfig::new("http://localhost:4200".to_string());
        let cookie = state_cookie(&config, "xyz");
        let value = cookie.ok().and_then(|v| v.to_str().ok().map(str::to_string));
        assert_eq!(
            value.as_deref(),
            Some("dashgate_oauth_state=xyz; Path=/; HttpOnly; SameSite=Lax; Max-Age=600")
        );
    }

    #[test]
    fn read_cookie_finds_named_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; dashgate_oauth_state=xyz ; token=abc"),
        );
        assert_eq!(
            read_cookie(&headers, STATE_COOKIE_NAME),
            Some("xyz".to_string())
        );
        assert_eq!(read_cookie(&headers, "token"), Some("abc".to_string()));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn found_sets_location_and_cookies() -> Result<(), ApiError> {
        let response = found(
            "https://dash.example.test/not-invited",
            [HeaderValue::from_static("a=1"), HeaderValue::from_static("b=2")],
        )?;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION),
            Some(&HeaderValue::from_static(
                "https://dash.example.test/not-invited"
            ))
        );
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
        Ok(())
    }
}

//! GitHub as identity provider and team membership checker.
//!
//! Flow Overview:
//! 1) `/v1/github/login` redirects to [`IdentityProvider::authorize_url`].
//! 2) The callback trades the code for an [`AccessToken`] and reads the user.
//! 3) [`MembershipChecker::membership`] asks the teams API whether that user
//!    is an active member of the configured team.

use crate::session::{Identity, MembershipState};
use async_trait::async_trait;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    Client, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info_span, instrument, Instrument};
use url::Url;

pub const DEFAULT_OAUTH_URL: &str = "https://github.com";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
const OAUTH_SCOPE: &str = "read:org";
const GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to identity provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("oauth code exchange rejected: {0}")]
    Exchange(String),
    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
}

/// OAuth access token returned by the code exchange.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(SecretString::from(token))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// OAuth2 authorization-code flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start the login, carrying `state`.
    fn authorize_url(&self, state: &str) -> Result<Url, ProviderError>;

    /// Trade an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError>;

    /// Read the authenticated user's identity.
    async fn identity(&self, token: &AccessToken) -> Result<Identity, ProviderError>;
}

/// Organization/team membership lookup.
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn membership(
        &self,
        token: &AccessToken,
        login: &str,
    ) -> Result<MembershipState, ProviderError>;
}

#[derive(Clone, Debug)]
pub struct GithubConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: Option<String>,
    pub team_id: u64,
    pub oauth_url: Url,
    pub api_url: Url,
}

#[derive(Debug)]
pub struct GithubClient {
    config: GithubConfig,
    http: Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct MembershipResponse {
    state: String,
}

impl GithubClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GithubConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self { config, http })
    }

    #[must_use]
    pub fn team_id(&self) -> u64 {
        self.config.team_id
    }

    fn api(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.config.api_url.join(path)?)
    }
}

#[async_trait]
impl IdentityProvider for GithubClient {
    fn authorize_url(&self, state: &str) -> Result<Url, ProviderError> {
        let mut url = self.config.oauth_url.join("login/oauth/authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            if let Some(redirect_url) = &self.config.redirect_url {
                query.append_pair("redirect_uri", redirect_url);
            }
            query.append_pair("scope", OAUTH_SCOPE);
            query.append_pair("state", state);
        }
        Ok(url)
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError> {
        let url = self.config.oauth_url.join("login/oauth/access_token")?;
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("code", code),
        ];
        if let Some(redirect_url) = &self.config.redirect_url {
            form.push(("redirect_uri", redirect_url.as_str()));
        }

        let span = info_span!("github.oauth.exchange", http.method = "POST");
        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .instrument(span)
            .await?;
        let response = error_for_status(response).await?;
        let body: TokenResponse = response.json().await?;

        token_from_response(body)
    }

    #[instrument(skip(self, token))]
    async fn identity(&self, token: &AccessToken) -> Result<Identity, ProviderError> {
        let span = info_span!("github.user", http.method = "GET");
        let response = self
            .http
            .get(self.api("user")?)
            .header(ACCEPT, GITHUB_JSON)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .send()
            .instrument(span)
            .await?;
        let response = error_for_status(response).await?;
        let user: UserResponse = response.json().await?;

        debug!(login = %user.login, "identity resolved");

        Ok(Identity {
            name: user.name,
            login: user.login,
        })
    }
}

#[async_trait]
impl MembershipChecker for GithubClient {
    #[instrument(skip(self, token))]
    async fn membership(
        &self,
        token: &AccessToken,
        login: &str,
    ) -> Result<MembershipState, ProviderError> {
        let path = format!("teams/{}/memberships/{login}", self.config.team_id);
        let span = info_span!("github.team.membership", http.method = "GET");
        let response = self
            .http
            .get(self.api(&path)?)
            .header(ACCEPT, GITHUB_JSON)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .send()
            .instrument(span)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(MembershipState::Absent);
        }

        let response = error_for_status(response).await?;
        let membership: MembershipResponse = response.json().await?;

        Ok(MembershipState::from_state(&membership.state))
    }
}

/// Turn a non-success response into [`ProviderError::Status`] with its body.
async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status { status, body })
}

/// GitHub answers a failed exchange with `200` and an `error` field.
fn token_from_response(body: TokenResponse) -> Result<AccessToken, ProviderError> {
    match (body.access_token, body.error) {
        (Some(token), None) if !token.is_empty() => Ok(AccessToken::new(token)),
        (_, Some(error)) => Err(ProviderError::Exchange(
            body.error_description
                .map_or_else(|| error.clone(), |desc| format!("{error}: {desc}")),
        )),
        _ => Err(ProviderError::Exchange("missing access_token".to_string())),
    }
}

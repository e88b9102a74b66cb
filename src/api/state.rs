//! Application configuration and the shared state handed to every handler.

use crate::{
    debug::DebugService,
    github::{IdentityProvider, MembershipChecker},
    session::{SessionIssuer, SessionStore, SessionValidator, SESSION_COOKIE_TTL, SESSION_TTL},
};
use std::{path::PathBuf, sync::Arc, time::Duration};

const DEFAULT_STATIC_DIR: &str = "./app/dist/micro";

#[derive(Clone, Debug)]
pub struct AppConfig {
    frontend_base_url: String,
    static_dir: PathBuf,
    session_ttl: Duration,
    cookie_ttl: Duration,
}

impl AppConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            session_ttl: SESSION_TTL,
            cookie_ttl: SESSION_COOKIE_TTL,
        }
    }

    #[must_use]
    pub fn with_static_dir(mut self, static_dir: PathBuf) -> Self {
        self.static_dir = static_dir;
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Landing page after a successful login.
    #[must_use]
    pub fn landing_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Where users outside the team are sent.
    #[must_use]
    pub fn not_invited_url(&self) -> String {
        format!("{}/not-invited", self.frontend_base_url.trim_end_matches('/'))
    }

    #[must_use]
    pub fn static_dir(&self) -> &PathBuf {
        &self.static_dir
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn cookie_ttl(&self) -> Duration {
        self.cookie_ttl
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything a request needs. Built once at startup and shared behind an `Arc`.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn SessionStore>,
    issuer: SessionIssuer,
    validator: SessionValidator,
    identity: Arc<dyn IdentityProvider>,
    membership: Arc<dyn MembershipChecker>,
    debug: Arc<dyn DebugService>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        membership: Arc<dyn MembershipChecker>,
        debug: Arc<dyn DebugService>,
    ) -> Self {
        let issuer = SessionIssuer::new(store.clone()).with_ttl(config.session_ttl());
        let validator = SessionValidator::new(store.clone());
        Self {
            config,
            store,
            issuer,
            validator,
            identity,
            membership,
            debug,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn validator(&self) -> &SessionValidator {
        &self.validator
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn membership(&self) -> &dyn MembershipChecker {
        self.membership.as_ref()
    }

    #[must_use]
    pub fn debug(&self) -> &dyn DebugService {
        self.debug.as_ref()
    }
}

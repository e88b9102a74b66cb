//! Presence-only session checks.

use super::{
    store::{SessionStore, StoreError},
    UserRecord,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Token missing")]
    Missing,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Not found")]
    NotFound,
    #[error("failed to decode user record: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ValidationError {
    /// True when the caller, not the server, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Missing | Self::NotLoggedIn | Self::NotFound)
    }
}

pub struct SessionValidator {
    store: Arc<dyn SessionStore>,
}

impl SessionValidator {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Succeed iff a non-expired record exists for `token`.
    ///
    /// The record content is not interpreted.
    ///
    /// # Errors
    /// [`ValidationError::Missing`] for an empty token,
    /// [`ValidationError::NotLoggedIn`] when the store has no record.
    pub async fn validate(&self, token: &str) -> Result<(), ValidationError> {
        self.lookup(token)
            .await?
            .map(|_| ())
            .ok_or(ValidationError::NotLoggedIn)
    }

    /// Resolve `token` into the user record stored at issuance.
    ///
    /// # Errors
    /// [`ValidationError::Missing`] for an empty token,
    /// [`ValidationError::NotFound`] when the store has no record,
    /// [`ValidationError::Corrupt`] when the payload does not decode.
    pub async fn current_user(&self, token: &str) -> Result<UserRecord, ValidationError> {
        let payload = self.lookup(token).await?.ok_or(ValidationError::NotFound)?;
        serde_json::from_slice(&payload).map_err(ValidationError::Corrupt)
    }

    async fn lookup(&self, token: &str) -> Result<Option<Vec<u8>>, ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::Missing);
        }
        Ok(self.store.get(token).await?)
    }
}

impl std::fmt::Debug for SessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionValidator").finish_non_exhaustive()
    }
}

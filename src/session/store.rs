//! Storage contract for session records.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("session ttl out of range: {0:?}")]
    InvalidTtl(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Key-value storage keyed by session token, each entry carrying a TTL.
///
/// Implementations must be safe for concurrent use; callers never lock.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `value` under `token`, expiring `ttl` from now. Overwrites.
    async fn put(&self, token: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Return the value if present and not expired.
    ///
    /// Expired and never-written keys are both reported as `Ok(None)`.
    async fn get(&self, token: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}

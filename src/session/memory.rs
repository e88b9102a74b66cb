//! In-memory session store with lazy expiry and an optional sweeper task.

use super::store::{SessionStore, StoreError};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, warn};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(&self, token: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(StoreError::InvalidTtl(ttl))?;
        let mut entries = self.entries.write().await;
        entries.insert(token.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(token)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}

/// Periodically purge expired sessions from `store`.
///
/// The first tick fires after one full `interval`.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "expired sessions purged"),
                Err(err) => warn!(error = %err, "failed to purge expired sessions"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_stored_value() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store
            .put("abc", b"value".to_vec(), Duration::from_secs(60))
            .await?;
        assert_eq!(store.get("abc").await?, Some(b"value".to_vec()));
        assert_eq!(store.get("missing").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store
            .put("abc", b"first".to_vec(), Duration::from_secs(60))
            .await?;
        store
            .put("abc", b"second".to_vec(), Duration::from_secs(60))
            .await?;
        assert_eq!(store.get("abc").await?, Some(b"second".to_vec()));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn zero_ttl_is_never_returned() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store.put("abc", b"value".to_vec(), Duration::ZERO).await?;
        assert_eq!(store.get("abc").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn purge_removes_only_expired() -> Result<(), StoreError> {
        let store = MemoryStore::new();
        store.put("old", b"x".to_vec(), Duration::ZERO).await?;
        store
            .put("new", b"y".to_vec(), Duration::from_secs(60))
            .await?;
        assert_eq!(store.purge_expired().await?, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("new").await?, Some(b"y".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn overflowing_ttl_is_rejected() {
        let store = MemoryStore::new();
        let result = store.put("abc", Vec::new(), Duration::MAX).await;
        assert!(matches!(result, Err(StoreError::InvalidTtl(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_on_interval() -> Result<(), StoreError> {
        let store = Arc::new(MemoryStore::new());
        store.put("old", b"x".to_vec(), Duration::ZERO).await?;

        let handle = spawn_sweeper(store.clone(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(25)).await;
        handle.abort();

        assert!(store.is_empty().await);
        Ok(())
    }
}

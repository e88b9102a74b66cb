//! Turns a successful login into a stored session.

use super::{
    store::{SessionStore, StoreError},
    random_token, Identity, MembershipState, UserRecord, SESSION_TTL,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("user is not an active team member")]
    NotAuthorized,
    #[error("failed to serialize user record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to generate session token: {0}")]
    TokenGeneration(#[from] rand::Error),
    #[error("failed to persist session: {0}")]
    Persist(#[from] StoreError),
}

pub struct SessionIssuer {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            ttl: SESSION_TTL,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session for `identity` and return its token.
    ///
    /// Nothing is written unless `membership` is active. Earlier tokens for
    /// the same identity stay valid.
    ///
    /// # Errors
    /// [`IssueError::NotAuthorized`] for any non-active membership, otherwise
    /// serialization, entropy or storage failures.
    #[instrument(skip(self, identity), fields(login = %identity.login))]
    pub async fn issue(
        &self,
        identity: &Identity,
        membership: &MembershipState,
    ) -> Result<String, IssueError> {
        if !membership.is_active() {
            debug!(?membership, "membership not active, no session issued");
            return Err(IssueError::NotAuthorized);
        }

        let record = UserRecord {
            name: identity.display_name().to_string(),
        };
        let payload = serde_json::to_vec(&record)?;
        let token = random_token()?;

        self.store.put(&token, payload, self.ttl).await?;

        debug!("session issued");

        Ok(token)
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStore, SessionValidator};
    use async_trait::async_trait;

    fn identity(name: &str) -> Identity {
        Identity {
            name: Some(name.to_string()),
            login: name.to_lowercase(),
        }
    }

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn put(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn issue_stores_user_record() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let issuer = SessionIssuer::new(store.clone());

        let token = issuer
            .issue(&identity("Ada"), &MembershipState::Active)
            .await?;

        let payload = store.get(&token).await?;
        let record: Option<UserRecord> = payload
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?;
        assert_eq!(
            record,
            Some(UserRecord {
                name: "Ada".to_string()
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn non_active_membership_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let issuer = SessionIssuer::new(store.clone());

        for membership in [
            MembershipState::Pending,
            MembershipState::Absent,
            MembershipState::Unknown("lookup failed".to_string()),
        ] {
            let result = issuer.issue(&identity("Bob"), &membership).await;
            assert!(matches!(result, Err(IssueError::NotAuthorized)));
        }

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_persist_error() {
        let issuer = SessionIssuer::new(Arc::new(FailingStore));
        let result = issuer
            .issue(&identity("Ada"), &MembershipState::Active)
            .await;
        assert!(matches!(result, Err(IssueError::Persist(_))));
    }

    #[tokio::test]
    async fn reissue_keeps_older_tokens_valid() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let issuer = SessionIssuer::new(store.clone());
        let validator = SessionValidator::new(store);

        let first = issuer
            .issue(&identity("Ada"), &MembershipState::Active)
            .await?;
        let second = issuer
            .issue(&identity("Ada"), &MembershipState::Active)
            .await?;

        assert_ne!(first, second);
        validator.validate(&first).await?;
        validator.validate(&second).await?;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_issuances_produce_distinct_tokens() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let issuer = SessionIssuer::new(store.clone());
        let validator = SessionValidator::new(store);

        let ada = identity("Ada");
        let grace = identity("Grace");
        let (first, second) = tokio::join!(
            issuer.issue(&ada, &MembershipState::Active),
            issuer.issue(&grace, &MembershipState::Active),
        );
        let (first, second) = (first?, second?);

        assert_ne!(first, second);
        assert_eq!(validator.current_user(&first).await?.name, "Ada");
        assert_eq!(validator.current_user(&second).await?.name, "Grace");
        Ok(())
    }
}

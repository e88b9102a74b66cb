//! `PostgreSQL` session store.
//!
//! Records live in a single table keyed by token. Expiry is stored as unix
//! milliseconds and enforced on read; `purge_expired` removes stale rows.

use super::store::{SessionStore, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool, Row};
use std::time::{Duration, SystemTime};
use tracing::{info, info_span, Instrument};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS dashgate_sessions (
    token TEXT PRIMARY KEY,
    payload BYTEA NOT NULL,
    expires_at BIGINT NOT NULL
)";

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS dashgate_sessions_expires_at_idx ON dashgate_sessions (expires_at)";

const UPSERT_SQL: &str = "INSERT INTO dashgate_sessions (token, payload, expires_at)
    VALUES ($1, $2, $3)
    ON CONFLICT (token) DO UPDATE
    SET payload = EXCLUDED.payload, expires_at = EXCLUDED.expires_at";

const SELECT_SQL: &str =
    "SELECT payload FROM dashgate_sessions WHERE token = $1 AND expires_at > $2";

const PURGE_SQL: &str = "DELETE FROM dashgate_sessions WHERE expires_at <= $1";

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and make sure the sessions table exists.
    ///
    /// # Errors
    /// Returns an error if the connection or the schema setup fails.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self::new(pool);
        store
            .migrate()
            .await
            .context("Failed to create sessions table")?;

        info!("Using PostgreSQL session store");

        Ok(store)
    }

    /// Create the sessions table and its expiry index if missing.
    ///
    /// # Errors
    /// Returns the database error if a statement fails.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, token: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = expires_at_millis(now_unix_millis(), ttl)?;
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPSERT");
        sqlx::query(UPSERT_SQL)
            .bind(token)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(SELECT_SQL)
            .bind(token)
            .bind(now_unix_millis())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        let payload = row
            .map(|row| row.try_get::<Vec<u8>, _>("payload"))
            .transpose()?;
        Ok(payload)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "DELETE");
        let result = sqlx::query(PURGE_SQL)
            .bind(now_unix_millis())
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected())
    }
}

fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn expires_at_millis(now: i64, ttl: Duration) -> Result<i64, StoreError> {
    i64::try_from(ttl.as_millis())
        .ok()
        .and_then(|ttl_ms| now.checked_add(ttl_ms))
        .ok_or(StoreError::InvalidTtl(ttl))
}

//! SQLite implementation of the cycle lease port
//!
//! Acquisition is a single upsert that only overwrites a row when the lease
//! has expired or already belongs to the caller, so two processes racing on
//! the same database can never both see `rows_affected() == 1`.

use std::time::Duration;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use gdrelay_core::{
    domain::state::{STATE_COLLECTION, STATE_DOCUMENT},
    ports::ICycleLease,
};

use crate::StateError;

/// Expiring lease over the `state_leases` table
#[derive(Debug, Clone)]
pub struct SqliteCycleLease {
    pool: SqlitePool,
    name: String,
}

impl SqliteCycleLease {
    /// Lease guarding the relay document `state/drive`
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_name(pool, format!("{STATE_COLLECTION}/{STATE_DOCUMENT}"))
    }

    pub fn with_name(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    /// Current holder, if the lease is taken and unexpired
    pub async fn holder(&self) -> Result<Option<String>, StateError> {
        let row = sqlx::query(
            "SELECT holder FROM state_leases WHERE name = ? AND expires_at > ?",
        )
        .bind(&self.name)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_get::<String, _>("holder"))
            .transpose()
            .map_err(StateError::from)
    }

    async fn acquire(&self, holder: &str, ttl: Duration) -> Result<bool, StateError> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_ms);

        let result = sqlx::query(
            "INSERT INTO state_leases (name, holder, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT (name) DO UPDATE \
             SET holder = excluded.holder, expires_at = excluded.expires_at \
             WHERE state_leases.expires_at <= ? OR state_leases.holder = excluded.holder",
        )
        .bind(&self.name)
        .bind(holder)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let taken = result.rows_affected() == 1;
        tracing::trace!(lease = %self.name, holder, taken, "Cycle lease attempt");
        Ok(taken)
    }
}

#[async_trait::async_trait]
impl ICycleLease for SqliteCycleLease {
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> anyhow::Result<bool> {
        Ok(self.acquire(holder, ttl).await?)
    }

    async fn release(&self, holder: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM state_leases WHERE name = ? AND holder = ?")
            .bind(&self.name)
            .bind(holder)
            .execute(&self.pool)
            .await
            .map_err(StateError::from)?;
        tracing::trace!(lease = %self.name, holder, "Cycle lease released");
        Ok(())
    }
}

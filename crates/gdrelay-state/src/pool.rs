//! Database connection pool management
//!
//! Wraps SQLx's `SqlitePool` with directory creation, WAL journal mode,
//! schema migration at open, and an in-memory mode for tests.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Executor;

use crate::StateError;

/// Pool of SQLite connections for the relay state
///
/// File-based pools use WAL mode, up to 4 connections and a 5-second busy
/// timeout. In-memory pools use a single connection, since each SQLite
/// in-memory database lives and dies with its connection.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database at `db_path` and migrates it
    ///
    /// # Errors
    ///
    /// Returns `StateError::ConnectionFailed` if the directory or connection
    /// cannot be created, or `StateError::MigrationFailed` if the schema
    /// cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, StateError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StateError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                StateError::ConnectionFailed(format!(
                    "Failed to open state database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(path = %db_path.display(), "State database ready");

        Ok(Self { pool })
    }

    /// Creates an in-memory database for tests
    pub async fn in_memory() -> Result<Self, StateError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StateError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("In-memory state database ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StateError> {
        let migration_sql = include_str!("migrations/20261015_state_documents.sql");
        pool.execute(migration_sql).await.map_err(|e| {
            StateError::MigrationFailed(format!("Failed to create state_documents: {}", e))
        })?;

        let lease_sql = include_str!("migrations/20261016_state_leases.sql");
        pool.execute(lease_sql).await.map_err(|e| {
            StateError::MigrationFailed(format!("Failed to create state_leases: {}", e))
        })?;

        tracing::debug!("State migrations completed");
        Ok(())
    }
}

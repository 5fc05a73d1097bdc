//! gdrelay State - Durable cursor store
//!
//! SQLite-backed storage for the relay document (`state/drive`) holding the
//! Drive page token and the last registered watch channel.
//!
//! ## Architecture
//!
//! This crate implements the `ICursorStore` and `ICycleLease` ports from
//! `gdrelay-core`. It is a driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteCursorStore`] - `ICursorStore` implementation over JSON documents
//! - [`SqliteCycleLease`] - `ICycleLease` implementation shared by every process on the file
//! - [`StateError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use gdrelay_state::{DatabasePool, SqliteCursorStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/gdrelay/state.db")).await?;
//! let store = SqliteCursorStore::new(pool.pool().clone());
//! // Use store as ICursorStore...
//! # Ok(())
//! # }
//! ```

pub mod lease;
pub mod pool;
pub mod repository;

pub use lease::SqliteCycleLease;
pub use pool::DatabasePool;
pub use repository::SqliteCursorStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored document is not a JSON object or does not match the state schema
    #[error("Corrupt document {collection}/{document}: {reason}")]
    CorruptDocument {
        collection: String,
        document: String,
        reason: String,
    },
}

impl From<sqlx::Error> for StateError {
    fn from(e: sqlx::Error) -> Self {
        StateError::QueryFailed(e.to_string())
    }
}

//! Cursor store port (driven/secondary port)
//!
//! Durable storage for the single relay document that holds the page token.
//!
//! ## Implementation Notes
//!
//! - `merge` is non-destructive: fields absent from the patch are preserved,
//!   including fields unknown to this crate.
//! - No locking: callers serialize cycles themselves (see
//!   [`CycleLock`](crate::usecases::CycleLock)).
//! - Store-unavailable errors propagate to the caller; no local retry.

use crate::domain::{RelayState, StatePatch};

/// Port trait for the durable cursor store
#[async_trait::async_trait]
pub trait ICursorStore: Send + Sync {
    /// Reads the relay document
    ///
    /// Returns [`RelayState::default`] when nothing has been stored yet.
    async fn read(&self) -> anyhow::Result<RelayState>;

    /// Merges the fields present in `patch` into the relay document
    async fn merge(&self, patch: &StatePatch) -> anyhow::Result<()>;
}

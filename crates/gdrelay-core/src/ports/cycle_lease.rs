//! Cycle lease port (driven/secondary port)
//!
//! A named, expiring lease held in the durable store. It extends the
//! in-process [`CycleLock`](crate::usecases::CycleLock) to every process that
//! shares the store, so a `gdrelayd pull` from the shell cannot interleave
//! with a webhook cycle in the running service.

use std::time::Duration;

/// Port trait for the cross-process cycle lease
#[async_trait::async_trait]
pub trait ICycleLease: Send + Sync {
    /// Takes the lease for `holder` for `ttl`
    ///
    /// Returns `false` while another holder has an unexpired lease. A holder
    /// that already owns the lease renews it.
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Gives the lease up if `holder` still owns it
    async fn release(&self, holder: &str) -> anyhow::Result<()>;
}

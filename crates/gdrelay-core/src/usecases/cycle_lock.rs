//! Cycle serialization
//!
//! Processing cycles and watch initialization both move the cursor, so at
//! most one of them may run at a time. Inside one process a shared mutex
//! orders them; across processes sharing a state database an expiring lease
//! in the store does. A lease whose holder died is taken over once it
//! expires.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{domain::RelayError, ports::ICycleLease};

/// Lease lifetime; longer than any cycle is expected to run
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(15 * 60);

/// How long [`CycleLock::acquire`] waits for another process's lease
pub const DEFAULT_LEASE_WAIT: Duration = Duration::from_secs(30);

const LEASE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Serializes processing cycles and watch initialization
///
/// Clones share the same in-process lock and the same lease holder id. A
/// processor and a watch manager built with clones of one `CycleLock` never
/// touch the cursor concurrently, and with a lease attached neither does any
/// other process using the same store.
#[derive(Clone)]
pub struct CycleLock {
    inner: Arc<Mutex<()>>,
    lease: Option<Arc<dyn ICycleLease>>,
    holder: Arc<str>,
    ttl: Duration,
    wait: Duration,
}

impl CycleLock {
    /// Creates a process-local lock
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(())),
            lease: None,
            holder: format!("{}-{}", std::process::id(), Uuid::new_v4()).into(),
            ttl: DEFAULT_LEASE_TTL,
            wait: DEFAULT_LEASE_WAIT,
        }
    }

    /// Also takes `lease` on every acquisition
    pub fn with_lease(mut self, lease: Arc<dyn ICycleLease>) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Overrides the lease lifetime and the time spent waiting for it
    pub fn with_lease_timing(mut self, ttl: Duration, wait: Duration) -> Self {
        self.ttl = ttl;
        self.wait = wait;
        self
    }

    /// Holder id written to the lease
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Waits for the in-process lock, then for the lease
    ///
    /// # Errors
    ///
    /// - [`RelayError::Busy`] if another holder keeps the lease past the wait
    /// - the lease store's error if it cannot be queried
    pub async fn acquire(&self) -> Result<CycleGuard> {
        let local = Arc::clone(&self.inner).lock_owned().await;

        let Some(lease) = &self.lease else {
            return Ok(CycleGuard { _local: local, lease: None });
        };

        let deadline = Instant::now() + self.wait;
        loop {
            let taken = lease
                .try_acquire(&self.holder, self.ttl)
                .await
                .context("Failed to query cycle lease")?;
            if taken {
                debug!(holder = %self.holder, "Cycle lease acquired");
                return Ok(CycleGuard {
                    _local: local,
                    lease: Some((Arc::clone(lease), Arc::clone(&self.holder))),
                });
            }
            if Instant::now() >= deadline {
                return Err(RelayError::Busy(format!(
                    "cycle lease still held by another process after {}s",
                    self.wait.as_secs()
                ))
                .into());
            }
            tokio::time::sleep(LEASE_POLL_INTERVAL).await;
        }
    }
}

impl Default for CycleLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CycleLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleLock")
            .field("holder", &self.holder)
            .field("leased", &self.lease.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Held for the duration of one cycle or initialization
///
/// Call [`release`](Self::release) when done. A guard dropped without it
/// (for example by a cancelled request) hands the lease release to the
/// runtime.
pub struct CycleGuard {
    _local: OwnedMutexGuard<()>,
    lease: Option<(Arc<dyn ICycleLease>, Arc<str>)>,
}

impl CycleGuard {
    /// Gives up the lease and then the in-process lock
    pub async fn release(mut self) {
        if let Some((lease, holder)) = self.lease.take() {
            if let Err(e) = lease.release(&holder).await {
                warn!(holder = %holder, error = %e, "Failed to release cycle lease; it will expire");
            }
        }
    }
}

impl fmt::Debug for CycleGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleGuard")
            .field("holder", &self.lease.as_ref().map(|(_, holder)| holder))
            .finish()
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        let Some((lease, holder)) = self.lease.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = lease.release(&holder).await {
                        warn!(holder = %holder, error = %e, "Failed to release cycle lease; it will expire");
                    }
                });
            }
            Err(_) => warn!(holder = %holder, "Cycle lease left to expire"),
        }
    }
}

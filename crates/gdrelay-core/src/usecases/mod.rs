//! Use cases (interactors) for gdrelay
//!
//! Use cases orchestrate domain types and port interfaces. They hold no I/O
//! of their own: every remote call goes through a port.
//!
//! ## Use Cases
//!
//! - [`ChangeProcessor`] - One processing cycle: enumerate, filter, fetch, upload, commit
//! - [`ContentFetcher`] - Export or download a file's content
//! - [`WatchChannelManager`] - Seed the cursor and register a push channel
//! - [`WebhookAuthenticator`] - Channel-token check for inbound notifications
//! - [`CycleLock`] - One cycle or initialization at a time, across processes

pub mod authenticate_webhook;
pub mod cycle_lock;
pub mod fetch_content;
pub mod initialize_watch;
pub mod process_changes;

#[cfg(test)]
pub(crate) mod testing;

pub use authenticate_webhook::WebhookAuthenticator;
pub use cycle_lock::{CycleGuard, CycleLock};
pub use fetch_content::ContentFetcher;
pub use initialize_watch::WatchChannelManager;
pub use process_changes::ChangeProcessor;

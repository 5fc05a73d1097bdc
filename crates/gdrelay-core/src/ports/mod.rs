//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the core depends on; their implementations live
//! in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDriveProvider`] - Google Drive change feed, metadata, content, watch channels
//! - [`ICursorStore`] - Durable storage of the relay document (page token)
//! - [`ICycleLease`] - Expiring lease serializing cycles across processes
//! - [`IIngestionService`] - Knowledge-base upload endpoint

pub mod cursor_store;
pub mod cycle_lease;
pub mod drive_provider;
pub mod ingestion;

pub use cursor_store::ICursorStore;
pub use cycle_lease::ICycleLease;
pub use drive_provider::{ChangeBatch, IDriveProvider};
pub use ingestion::{IIngestionService, IngestionRecord};

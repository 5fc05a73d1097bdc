//! gdrelay Core - Domain logic for the Drive change relay
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `PageToken`, `FileId`, `ChangeRecord`, `FileSnapshot`, `UploadArtifact`
//! - **Use cases** - `ChangeProcessor`, `ContentFetcher`, `WatchChannelManager`, `WebhookAuthenticator`
//! - **Port definitions** - Traits for adapters: `IDriveProvider`, `ICursorStore`, `IIngestionService`
//! - **State machine** - The per-cycle processing states
//!
//! # Architecture
//!
//! The domain module holds pure types with no I/O. Ports define the trait
//! interfaces that the adapter crates (`gdrelay-drive`, `gdrelay-dify`,
//! `gdrelay-state`) implement. Use cases orchestrate the domain through ports.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;

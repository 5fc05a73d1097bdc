//! Domain entities and business logic
//!
//! This module contains the core domain types for gdrelay:
//! - Newtypes for the page token and Drive identifiers
//! - Change-feed records, file snapshots and export mapping
//! - The persisted relay state document
//! - Watch channel types
//! - The processing-cycle state machine
//! - Domain-specific error types

pub mod change;
pub mod cycle;
pub mod errors;
pub mod newtypes;
pub mod state;
pub mod watch;

// Re-export commonly used types
pub use change::{ChangeRecord, EmbeddedFile, ExportFormat, FileSnapshot, UploadArtifact};
pub use cycle::{CycleState, CycleSummary, SkipCounts, SkipReason};
pub use errors::{DomainError, RelayError};
pub use newtypes::*;
pub use state::{RelayState, StatePatch};
pub use watch::{WatchChannel, WatchInitialization, WatchRequest};

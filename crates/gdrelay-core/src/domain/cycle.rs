//! Processing-cycle state machine and summary
//!
//! One cycle walks `Idle -> Enumerating -> Fetching -> Uploading -> Committing
//! -> Idle`. `Failed` is absorbing for the cycle only; the next trigger starts
//! a fresh cycle from the last committed page token.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::DomainError;
use super::newtypes::PageToken;

/// States of a single processing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Enumerating,
    Fetching,
    Uploading,
    Committing,
    Failed,
}

impl CycleState {
    /// Returns true if the cycle may move from `self` to `next`
    pub fn can_transition_to(self, next: CycleState) -> bool {
        use CycleState::*;
        match (self, next) {
            (_, Failed) => self != Idle,
            (Idle, Enumerating) => true,
            // An empty or fully filtered batch goes straight to committing
            (Enumerating, Fetching) | (Enumerating, Committing) => true,
            (Fetching, Uploading) => true,
            (Uploading, Fetching) | (Uploading, Committing) => true,
            (Committing, Idle) => true,
            _ => false,
        }
    }

    /// Checked transition
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidState`] for a transition the machine does not allow
    pub fn transition(self, next: CycleState) -> Result<CycleState, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidState {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Enumerating => "enumerating",
            CycleState::Fetching => "fetching",
            CycleState::Uploading => "uploading",
            CycleState::Committing => "committing",
            CycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a change record did not produce an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Removed,
    MissingFileId,
    Trashed,
    OutsideTargetFolder,
    Container,
}

/// Counters for the skip reasons of one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub removed: u32,
    pub missing_file_id: u32,
    pub trashed: u32,
    pub outside_target_folder: u32,
    pub container: u32,
}

impl SkipCounts {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Removed => self.removed += 1,
            SkipReason::MissingFileId => self.missing_file_id += 1,
            SkipReason::Trashed => self.trashed += 1,
            SkipReason::OutsideTargetFolder => self.outside_target_folder += 1,
            SkipReason::Container => self.container += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.removed
            + self.missing_file_id
            + self.trashed
            + self.outside_target_folder
            + self.container
    }
}

/// Report of one processing cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Final state: `Idle` after a committed cycle, `Failed` otherwise
    pub state: CycleState,
    pub start_token: PageToken,
    /// Token committed by this cycle, if any
    pub committed_token: Option<PageToken>,
    pub records_seen: u32,
    pub uploaded: u32,
    pub skipped: SkipCounts,
    pub error: Option<String>,
}

impl CycleSummary {
    pub fn new(start_token: PageToken) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            state: CycleState::Idle,
            start_token,
            committed_token: None,
            records_seen: 0,
            uploaded: 0,
            skipped: SkipCounts::default(),
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == CycleState::Idle && self.error.is_none()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

//! Machine-readable outcome of a migration run.

use jiff::Timestamp;
use serde::Serialize;

use crate::availability::PollStats;
use crate::migration::MigrationPhase;

/// When a phase was entered, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    pub phase: MigrationPhase,
    pub entered_at: Timestamp,
    pub description: String,
}

/// Summary written after a run, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Last phase reached.
    pub final_phase: MigrationPhase,
    /// Every phase entered, starting with `Init`.
    pub history: Vec<PhaseRecord>,
    /// Probe statistics from the availability wait.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<PollStats>,
    /// Cleanup failure; does not affect the verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
    /// Fatal error that aborted the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl MigrationReport {
    /// The migration was proven correct, whatever happened during cleanup.
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.final_phase.is_migration_verified()
    }

    /// Phases in the order they were entered.
    pub fn phases(&self) -> Vec<MigrationPhase> {
        self.history.iter().map(|r| r.phase).collect()
    }
}

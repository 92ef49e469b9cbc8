//! Summary of a single `migrate` run.

use crate::identifier::{MigrationId, NodeId, RunnerIdentifier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// What happened to one pending migration the engine visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Script ran and the migration was recorded
    Executed,
    /// Script skipped, migration recorded (jump-and-mark)
    Marked,
    /// Script skipped, migration not recorded
    Jumped,
    /// Script failed, migration not recorded
    Failed,
    /// Script failed, migration recorded anyway
    FailedMarked,
    /// Pre-execution policy stopped the run at this migration
    Stopped,
}

impl OutcomeStatus {
    /// Whether a ledger row was written for this outcome.
    pub fn is_recorded(self) -> bool {
        matches!(
            self,
            OutcomeStatus::Executed | OutcomeStatus::Marked | OutcomeStatus::FailedMarked
        )
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Executed => write!(f, "executed"),
            OutcomeStatus::Marked => write!(f, "marked"),
            OutcomeStatus::Jumped => write!(f, "jumped"),
            OutcomeStatus::Failed => write!(f, "failed"),
            OutcomeStatus::FailedMarked => write!(f, "failed (marked)"),
            OutcomeStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of one visited migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    pub node: NodeId,
    pub migration: MigrationId,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`Migrator::migrate`](crate::engine::Migrator::migrate).
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Short random identifier for log correlation
    pub run_id: String,
    /// Ledger scope the run used
    pub runner_identifier: RunnerIdentifier,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Scripts that ran successfully
    pub executed_count: usize,
    /// Ledger rows written (before commit or rollback)
    pub recorded_count: usize,
    /// Whether any script failed
    pub has_errors: bool,
    /// Whether the unit of work was committed
    pub committed: bool,
    /// One entry per visited pending migration, in execution order
    pub outcomes: Vec<MigrationOutcome>,
}

impl MigrationReport {
    /// Whether nothing was executed or recorded.
    pub fn is_noop(&self) -> bool {
        self.executed_count == 0 && self.recorded_count == 0
    }

    /// Outcomes with a given status.
    pub fn with_status(&self, status: OutcomeStatus) -> impl Iterator<Item = &MigrationOutcome> {
        self.outcomes.iter().filter(move |o| o.status == status)
    }
}

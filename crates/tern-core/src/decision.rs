//! Decision hooks consulted by the engine.
//!
//! Each control point has its own policy trait with a closed result enum:
//!
//! - [`PreExecutionPolicy`]: before a pending migration runs
//! - [`ErrorPolicy`]: after a migration script fails
//! - [`CompletionPolicy`]: once, after the last migration, to commit or roll back
//!
//! Closures with the matching signature implement the traits, and every
//! decision enum is itself a policy that always returns that decision.
//! Decision names coming from configuration or the command line are parsed
//! with [`FromStr`]; an unknown name is a [`CoreError::UnimplementedDecision`].

use crate::error::{CoreError, StoreError};
use crate::identifier::MigrationId;
use crate::migration::Migration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// What to do with a pending migration before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreExecutionDecision {
    /// Execute the script and record it on success
    #[default]
    Run,
    /// Stop the whole run without executing or recording
    Stop,
    /// Skip this migration without recording it
    Jump,
    /// Skip execution but record the migration as applied
    JumpAndMark,
}

/// What to do after a migration script fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDecision {
    /// Stop the run; do not record the failed migration
    #[default]
    Stop,
    /// Stop the run but record the failed migration as applied
    MarkAnywayAndStop,
    /// Move on to the next migration without recording
    Continue,
    /// Record the failed migration as applied and move on
    MarkAnywayAndContinue,
}

/// How to finish the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionDecision {
    /// Make scripts and ledger rows durable
    Commit,
    /// Discard every effect of the run
    #[default]
    Rollback,
}

impl ErrorDecision {
    /// Whether the failed migration is still written to the ledger.
    pub fn records(self) -> bool {
        matches!(
            self,
            ErrorDecision::MarkAnywayAndStop | ErrorDecision::MarkAnywayAndContinue
        )
    }

    /// Whether the run stops after this migration.
    pub fn stops(self) -> bool {
        matches!(self, ErrorDecision::Stop | ErrorDecision::MarkAnywayAndStop)
    }
}

/// Normalize `kebab-case` and mixed case input to `snake_case`.
fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('-', "_")
}

impl FromStr for PreExecutionDecision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "run" => Ok(Self::Run),
            "stop" => Ok(Self::Stop),
            "jump" => Ok(Self::Jump),
            "jump_and_mark" => Ok(Self::JumpAndMark),
            _ => Err(CoreError::UnimplementedDecision {
                hook: "pre-execution",
                value: s.to_string(),
                expected: "run, stop, jump, jump_and_mark",
            }),
        }
    }
}

impl FromStr for ErrorDecision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "stop" => Ok(Self::Stop),
            "mark_anyway_and_stop" => Ok(Self::MarkAnywayAndStop),
            "continue" => Ok(Self::Continue),
            "mark_anyway_and_continue" => Ok(Self::MarkAnywayAndContinue),
            _ => Err(CoreError::UnimplementedDecision {
                hook: "error",
                value: s.to_string(),
                expected: "stop, mark_anyway_and_stop, continue, mark_anyway_and_continue",
            }),
        }
    }
}

impl FromStr for CompletionDecision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "commit" => Ok(Self::Commit),
            "rollback" => Ok(Self::Rollback),
            _ => Err(CoreError::UnimplementedDecision {
                hook: "completion",
                value: s.to_string(),
                expected: "commit, rollback",
            }),
        }
    }
}

impl fmt::Display for PreExecutionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Stop => write!(f, "stop"),
            Self::Jump => write!(f, "jump"),
            Self::JumpAndMark => write!(f, "jump_and_mark"),
        }
    }
}

impl fmt::Display for ErrorDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::MarkAnywayAndStop => write!(f, "mark_anyway_and_stop"),
            Self::Continue => write!(f, "continue"),
            Self::MarkAnywayAndContinue => write!(f, "mark_anyway_and_continue"),
        }
    }
}

impl fmt::Display for CompletionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
        }
    }
}

// ── Policy traits ──────────────────────────────────────────────────────

/// Consulted once for every pending migration, before its script runs.
pub trait PreExecutionPolicy {
    fn decide(&mut self, migration: &dyn Migration) -> PreExecutionDecision;
}

/// Consulted when a migration script fails.
pub trait ErrorPolicy {
    fn decide(&mut self, migration: &dyn Migration, failure: &StoreError) -> ErrorDecision;
}

/// Consulted once per run, and only if something was executed or recorded.
pub trait CompletionPolicy {
    fn decide(&mut self, has_errors: bool) -> CompletionDecision;
}

impl<F> PreExecutionPolicy for F
where
    F: FnMut(&dyn Migration) -> PreExecutionDecision,
{
    fn decide(&mut self, migration: &dyn Migration) -> PreExecutionDecision {
        self(migration)
    }
}

impl<F> ErrorPolicy for F
where
    F: FnMut(&dyn Migration, &StoreError) -> ErrorDecision,
{
    fn decide(&mut self, migration: &dyn Migration, failure: &StoreError) -> ErrorDecision {
        self(migration, failure)
    }
}

impl<F> CompletionPolicy for F
where
    F: FnMut(bool) -> CompletionDecision,
{
    fn decide(&mut self, has_errors: bool) -> CompletionDecision {
        self(has_errors)
    }
}

impl PreExecutionPolicy for PreExecutionDecision {
    fn decide(&mut self, _migration: &dyn Migration) -> PreExecutionDecision {
        *self
    }
}

impl ErrorPolicy for ErrorDecision {
    fn decide(&mut self, _migration: &dyn Migration, _failure: &StoreError) -> ErrorDecision {
        *self
    }
}

impl CompletionPolicy for CompletionDecision {
    fn decide(&mut self, _has_errors: bool) -> CompletionDecision {
        *self
    }
}

// ── Built-in policies ──────────────────────────────────────────────────

/// Commit strategy keyed on whether the run saw script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit only when no script failed
    #[default]
    OnSuccess,
    /// Commit even when scripts failed
    Always,
    /// Never commit (dry run)
    Never,
}

impl CompletionPolicy for CommitPolicy {
    fn decide(&mut self, has_errors: bool) -> CompletionDecision {
        match self {
            CommitPolicy::OnSuccess if !has_errors => CompletionDecision::Commit,
            CommitPolicy::OnSuccess => CompletionDecision::Rollback,
            CommitPolicy::Always => CompletionDecision::Commit,
            CommitPolicy::Never => CompletionDecision::Rollback,
        }
    }
}

impl FromStr for CommitPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "on_success" => Ok(Self::OnSuccess),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(CoreError::UnimplementedDecision {
                hook: "completion",
                value: s.to_string(),
                expected: "on_success, always, never",
            }),
        }
    }
}

impl fmt::Display for CommitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnSuccess => write!(f, "on_success"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// Run migrations up to and including `target`, then stop.
///
/// If `target` is already applied or filtered out, every visited pending
/// migration runs.
#[derive(Debug, Clone)]
pub struct StopAfter {
    target: MigrationId,
    reached: bool,
}

impl StopAfter {
    pub fn new(target: MigrationId) -> Self {
        Self {
            target,
            reached: false,
        }
    }
}

impl PreExecutionPolicy for StopAfter {
    fn decide(&mut self, migration: &dyn Migration) -> PreExecutionDecision {
        if self.reached {
            return PreExecutionDecision::Stop;
        }
        if migration.id() == &self.target {
            self.reached = true;
        }
        PreExecutionDecision::Run
    }
}

/// Jump over the listed migrations and defer everything else to `inner`.
pub struct SkipListed<P> {
    skip: HashSet<MigrationId>,
    inner: P,
}

impl<P: PreExecutionPolicy> SkipListed<P> {
    pub fn new(skip: impl IntoIterator<Item = MigrationId>, inner: P) -> Self {
        Self {
            skip: skip.into_iter().collect(),
            inner,
        }
    }
}

impl<P: PreExecutionPolicy> PreExecutionPolicy for SkipListed<P> {
    fn decide(&mut self, migration: &dyn Migration) -> PreExecutionDecision {
        if self.skip.contains(migration.id()) {
            log::debug!("Skipping listed migration '{}'", migration.id());
            PreExecutionDecision::Jump
        } else {
            self.inner.decide(migration)
        }
    }
}

#[cfg(test)]
#[path = "decision_test.rs"]
mod tests;

//! Ledger store contract.
//!
//! A [`LedgerStore`] owns the bookkeeping table and hands out
//! [`LedgerTransaction`]s. Every script execution and ledger append of a run
//! goes through the same transaction object; nothing is durable until
//! [`LedgerTransaction::commit`] returns `Ok`. Implementations must roll back
//! a transaction that is dropped without being committed.

use crate::error::StoreResult;
use crate::identifier::{MigrationId, NodeId, RunnerIdentifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One row of the ledger: a migration applied (or marked) under a runner
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Ledger scope
    pub runner_identifier: RunnerIdentifier,
    /// Node the migration belonged to when it was recorded
    pub migration_node_id: NodeId,
    /// Migration identifier
    pub migration_id: MigrationId,
    /// Script text resolved for the run that recorded this entry
    pub last_run_script: String,
    /// When the entry was written
    pub last_run_date: DateTime<Utc>,
}

/// Access to the ledger and the database it lives in.
pub trait LedgerStore {
    /// Unit of work returned by [`begin`](Self::begin).
    type Transaction<'a>: LedgerTransaction
    where
        Self: 'a;

    /// Create the bookkeeping schema if it does not exist. Idempotent.
    fn upgrade_schema(&self) -> StoreResult<()>;

    /// Identifiers of every migration recorded for `runner`.
    fn list_executed_migrations(
        &self,
        runner: &RunnerIdentifier,
    ) -> StoreResult<HashSet<MigrationId>>;

    /// Every ledger row for `runner`, oldest first.
    fn ledger_entries(&self, runner: &RunnerIdentifier) -> StoreResult<Vec<LedgerEntry>>;

    /// Open the unit of work for a run.
    fn begin(&self) -> StoreResult<Self::Transaction<'_>>;
}

/// A single open unit of work.
pub trait LedgerTransaction {
    /// Execute an opaque SQL script.
    fn execute_sql(&mut self, sql: &str) -> StoreResult<()>;

    /// Append a ledger row.
    fn insert_executed_migration(&mut self, entry: &LedgerEntry) -> StoreResult<()>;

    /// Make every effect of this transaction durable.
    fn commit(self) -> StoreResult<()>;

    /// Discard every effect of this transaction.
    fn rollback(self) -> StoreResult<()>;
}

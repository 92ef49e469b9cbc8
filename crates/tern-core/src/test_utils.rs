//! Shared test utilities for tern-core
//!
//! [`MemoryLedger`] is an in-memory [`LedgerStore`] that buffers every
//! transaction until commit and keeps a log of the calls it received, so tests
//! can assert on ordering and on what became durable.

use crate::error::{StoreError, StoreResult};
use crate::identifier::{MigrationId, NodeId, RunnerIdentifier};
use crate::store::{LedgerEntry, LedgerStore, LedgerTransaction};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::HashSet;

/// A call received by [`MemoryLedger`] or one of its transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    UpgradeSchema,
    ListExecuted(String),
    Begin,
    ExecuteSql(String),
    Insert(String),
    Commit,
    Rollback,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    scripts: Vec<String>,
    calls: Vec<LedgerCall>,
    failing_scripts: HashSet<String>,
    list_failure: Option<String>,
    insert_failure: Option<String>,
}

/// In-memory ledger store.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RefCell<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `execute_sql` fail for exactly this script text.
    pub fn fail_script(&self, sql: &str) {
        self.state
            .borrow_mut()
            .failing_scripts
            .insert(sql.to_string());
    }

    /// Make `list_executed_migrations` fail.
    pub fn fail_listing(&self, message: &str) {
        self.state.borrow_mut().list_failure = Some(message.to_string());
    }

    /// Make `insert_executed_migration` fail.
    pub fn fail_inserts(&self, message: &str) {
        self.state.borrow_mut().insert_failure = Some(message.to_string());
    }

    /// Add a committed ledger row directly.
    pub fn seed_entry(&self, runner: &str, node: &str, migration: &str) {
        self.state.borrow_mut().entries.push(LedgerEntry {
            runner_identifier: RunnerIdentifier::new(runner),
            migration_node_id: NodeId::new(node),
            migration_id: MigrationId::new(migration),
            last_run_script: String::new(),
            last_run_date: Utc::now(),
        });
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state.borrow().calls.clone()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Committed ledger rows.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state.borrow().entries.clone()
    }

    /// Committed script texts, in execution order.
    pub fn committed_scripts(&self) -> Vec<String> {
        self.state.borrow().scripts.clone()
    }

    /// Scripts passed to `execute_sql`, committed or not.
    pub fn executed_sql(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                LedgerCall::ExecuteSql(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Migration ids passed to `insert_executed_migration`, committed or not.
    pub fn inserted(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                LedgerCall::Insert(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: LedgerCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl LedgerStore for MemoryLedger {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn upgrade_schema(&self) -> StoreResult<()> {
        self.record(LedgerCall::UpgradeSchema);
        Ok(())
    }

    fn list_executed_migrations(
        &self,
        runner: &RunnerIdentifier,
    ) -> StoreResult<HashSet<MigrationId>> {
        self.record(LedgerCall::ListExecuted(runner.to_string()));
        let state = self.state.borrow();
        if let Some(message) = &state.list_failure {
            return Err(StoreError::Ledger(message.clone()));
        }
        Ok(state
            .entries
            .iter()
            .filter(|e| &e.runner_identifier == runner)
            .map(|e| e.migration_id.clone())
            .collect())
    }

    fn ledger_entries(&self, runner: &RunnerIdentifier) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self
            .state
            .borrow()
            .entries
            .iter()
            .filter(|e| &e.runner_identifier == runner)
            .cloned()
            .collect())
    }

    fn begin(&self) -> StoreResult<MemoryTransaction<'_>> {
        self.record(LedgerCall::Begin);
        Ok(MemoryTransaction {
            ledger: self,
            scripts: Vec::new(),
            entries: Vec::new(),
            finished: false,
        })
    }
}

/// Buffered transaction over a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    ledger: &'a MemoryLedger,
    scripts: Vec<String>,
    entries: Vec<LedgerEntry>,
    finished: bool,
}

impl LedgerTransaction for MemoryTransaction<'_> {
    fn execute_sql(&mut self, sql: &str) -> StoreResult<()> {
        self.ledger.record(LedgerCall::ExecuteSql(sql.to_string()));
        if self.ledger.state.borrow().failing_scripts.contains(sql) {
            return Err(StoreError::Execution(format!("script failed: {sql}")));
        }
        self.scripts.push(sql.to_string());
        Ok(())
    }

    fn insert_executed_migration(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        self.ledger
            .record(LedgerCall::Insert(entry.migration_id.to_string()));
        if let Some(message) = &self.ledger.state.borrow().insert_failure {
            return Err(StoreError::Ledger(message.clone()));
        }
        self.entries.push(entry.clone());
        Ok(())
    }

    fn commit(mut self) -> StoreResult<()> {
        self.ledger.record(LedgerCall::Commit);
        let mut state = self.ledger.state.borrow_mut();
        state.scripts.append(&mut self.scripts);
        state.entries.append(&mut self.entries);
        drop(state);
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self) -> StoreResult<()> {
        self.ledger.record(LedgerCall::Rollback);
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.ledger.record(LedgerCall::Rollback);
        }
    }
}

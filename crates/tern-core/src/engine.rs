//! Execution engine.
//!
//! [`Migrator`] resolves the runner identifier, bootstraps the ledger,
//! classifies the catalogue, runs the filter chain, and then walks every
//! pending migration in catalogue order inside a single
//! [`LedgerTransaction`]. The three decision policies steer that walk; the
//! engine itself encodes no policy.

use crate::catalogue::CatalogueProvider;
use crate::decision::{
    CompletionDecision, CompletionPolicy, ErrorDecision, ErrorPolicy, PreExecutionDecision,
    PreExecutionPolicy,
};
use crate::error::{CoreError, CoreResult};
use crate::filter::{FilterChain, MigrationFilter};
use crate::identifier::{NodeId, RunnerIdentifier};
use crate::migration::{Migration, MigrationMap};
use crate::observer::{
    MigrationObserver, NullObserver, EVENT_FILTER, EVENT_MIGRATE, EVENT_MIGRATION, EVENT_RESOLVE,
};
use crate::report::{MigrationOutcome, MigrationReport, OutcomeStatus};
use crate::resolver::resolve_state;
use crate::state::StateSnapshot;
use crate::store::{LedgerEntry, LedgerStore, LedgerTransaction};
use chrono::Utc;
use uuid::Uuid;

/// Run-scoped flags and counters.
#[derive(Debug, Default)]
struct RunProgress {
    stop_all: bool,
    has_errors: bool,
    executed_count: usize,
    recorded_count: usize,
    outcomes: Vec<MigrationOutcome>,
}

/// Migration orchestrator bound to a ledger store.
///
/// Defaults fail closed: every pending migration runs, the first script
/// failure stops the run, and the unit of work is rolled back unless a
/// completion policy is installed that commits.
pub struct Migrator<'s, S: LedgerStore> {
    store: &'s S,
    identifier: Option<RunnerIdentifier>,
    filters: FilterChain,
    observer: Box<dyn MigrationObserver>,
    pre_execution: Box<dyn PreExecutionPolicy>,
    on_error: Box<dyn ErrorPolicy>,
    completion: Box<dyn CompletionPolicy>,
}

impl<'s, S: LedgerStore + 's> Migrator<'s, S> {
    /// Create a migrator with default policies and no identifier.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            identifier: None,
            filters: FilterChain::new(),
            observer: Box::new(NullObserver),
            pre_execution: Box::new(PreExecutionDecision::Run),
            on_error: Box::new(ErrorDecision::Stop),
            completion: Box::new(CompletionDecision::Rollback),
        }
    }

    /// Identifier used when the catalogue does not supply one.
    pub fn with_identifier(mut self, identifier: RunnerIdentifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Register a filter after any already registered.
    pub fn with_filter(mut self, filter: impl MigrationFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn with_observer(mut self, observer: impl MigrationObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn with_pre_execution(mut self, policy: impl PreExecutionPolicy + 'static) -> Self {
        self.pre_execution = Box::new(policy);
        self
    }

    pub fn with_error_policy(mut self, policy: impl ErrorPolicy + 'static) -> Self {
        self.on_error = Box::new(policy);
        self
    }

    pub fn with_completion_policy(mut self, policy: impl CompletionPolicy + 'static) -> Self {
        self.completion = Box::new(policy);
        self
    }

    /// The ledger store this migrator writes to.
    pub fn store(&self) -> &'s S {
        self.store
    }

    /// Pick the runner identifier for `map`: the map's own identifier wins
    /// over the one this migrator was built with.
    pub fn resolve_identifier(&self, map: &MigrationMap) -> CoreResult<RunnerIdentifier> {
        map.identifier()
            .or(self.identifier.as_ref())
            .cloned()
            .ok_or(CoreError::MissingRunnerIdentifier)
    }

    /// Load the catalogue from `catalogue` and migrate it.
    pub fn migrate(&mut self, catalogue: &dyn CatalogueProvider) -> CoreResult<MigrationReport> {
        let map = catalogue.migration_map()?;
        self.migrate_map(&map)
    }

    /// Classify and filter `map` without opening a unit of work.
    pub fn status<'a>(
        &mut self,
        map: &'a MigrationMap,
    ) -> CoreResult<(RunnerIdentifier, StateSnapshot<'a>)> {
        let runner = self.resolve_identifier(map)?;
        self.store.upgrade_schema()?;
        let snapshot = self.prepare(map, &runner)?;
        Ok((runner, snapshot))
    }

    /// Apply every pending migration of `map` in one unit of work.
    pub fn migrate_map(&mut self, map: &MigrationMap) -> CoreResult<MigrationReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string()[..8].to_string();

        // Configuration errors must surface before the database is touched.
        let runner = self.resolve_identifier(map)?;
        self.store.upgrade_schema()?;

        let snapshot = self.prepare(map, &runner)?;
        let pending = snapshot.pending_count();
        log::debug!("Run {run_id}: {pending} pending migration(s) for '{runner}'");

        let detail = format!("{pending} pending");
        self.observer
            .event_begin(EVENT_MIGRATE, runner.as_str(), Some(detail.as_str()));

        let store = self.store;
        let mut tx = store.begin()?;
        let mut run = RunProgress::default();

        'nodes: for node in snapshot.nodes() {
            for info in node.pending() {
                let outcome =
                    self.apply_migration(&mut tx, &runner, node.id(), info.migration(), &mut run)?;
                run.outcomes.push(outcome);
                if run.stop_all {
                    break 'nodes;
                }
            }
        }

        let committed = self.complete(tx, &run)?;
        self.observer.event_end(EVENT_MIGRATE, runner.as_str());
        self.filters.after_transaction(committed);

        Ok(MigrationReport {
            run_id,
            runner_identifier: runner,
            started_at,
            finished_at: Utc::now(),
            executed_count: run.executed_count,
            recorded_count: run.recorded_count,
            has_errors: run.has_errors,
            committed,
            outcomes: run.outcomes,
        })
    }

    /// Resolve states and run the filter chain.
    fn prepare<'a>(
        &mut self,
        map: &'a MigrationMap,
        runner: &RunnerIdentifier,
    ) -> CoreResult<StateSnapshot<'a>> {
        self.observer
            .event_begin(EVENT_RESOLVE, runner.as_str(), None);
        let mut snapshot = resolve_state(self.store, map, runner)?;
        self.observer.event_end(EVENT_RESOLVE, runner.as_str());

        if !self.filters.is_empty() {
            let detail = format!("{} filter(s)", self.filters.len());
            self.observer
                .event_begin(EVENT_FILTER, runner.as_str(), Some(detail.as_str()));
            self.filters.apply(&mut snapshot);
            self.observer.event_end(EVENT_FILTER, runner.as_str());
        }
        Ok(snapshot)
    }

    /// Decide, execute, and record a single pending migration.
    fn apply_migration(
        &mut self,
        tx: &mut S::Transaction<'s>,
        runner: &RunnerIdentifier,
        node: &NodeId,
        migration: &dyn Migration,
        run: &mut RunProgress,
    ) -> CoreResult<MigrationOutcome> {
        let label = format!("{}/{}", node, migration.id());
        let outcome = |status: OutcomeStatus, error: Option<String>| MigrationOutcome {
            node: node.clone(),
            migration: migration.id().clone(),
            status,
            error,
        };

        let decision = self.pre_execution.decide(migration);
        let (execute, mut record) = match decision {
            PreExecutionDecision::Run => (true, true),
            PreExecutionDecision::JumpAndMark => (false, true),
            PreExecutionDecision::Jump => {
                self.observer.info(&format!("Jumped {label}"));
                return Ok(outcome(OutcomeStatus::Jumped, None));
            }
            PreExecutionDecision::Stop => {
                run.stop_all = true;
                self.observer.info(&format!("Stopped before {label}"));
                return Ok(outcome(OutcomeStatus::Stopped, None));
            }
        };

        let sql = migration.upgrade_sql()?;
        let detail = decision.to_string();
        self.observer
            .event_begin(EVENT_MIGRATION, &label, Some(detail.as_str()));

        let mut status = if execute {
            OutcomeStatus::Executed
        } else {
            OutcomeStatus::Marked
        };
        let mut error = None;

        if execute {
            match tx.execute_sql(&sql) {
                Ok(()) => {
                    run.executed_count += 1;
                    log::debug!("Executed {label}");
                }
                Err(failure) => {
                    run.has_errors = true;
                    let on_error = self.on_error.decide(migration, &failure);
                    log::warn!("Migration {label} failed ({on_error}): {failure}");
                    record = on_error.records();
                    run.stop_all = on_error.stops();
                    status = if record {
                        OutcomeStatus::FailedMarked
                    } else {
                        OutcomeStatus::Failed
                    };
                    error = Some(failure.to_string());
                }
            }
        }

        if record {
            let entry = LedgerEntry {
                runner_identifier: runner.clone(),
                migration_node_id: node.clone(),
                migration_id: migration.id().clone(),
                last_run_script: sql,
                last_run_date: Utc::now(),
            };
            tx.insert_executed_migration(&entry)?;
            run.recorded_count += 1;
        }

        self.observer.event_end(EVENT_MIGRATION, &label);
        Ok(outcome(status, error))
    }

    /// Finish the unit of work. Returns whether it was committed.
    fn complete(&mut self, tx: S::Transaction<'s>, run: &RunProgress) -> CoreResult<bool> {
        if run.executed_count == 0 && run.recorded_count == 0 {
            self.observer
                .info("Nothing executed or recorded; no commit needed");
            tx.rollback()?;
            return Ok(false);
        }

        match self.completion.decide(run.has_errors) {
            CompletionDecision::Commit => {
                tx.commit()?;
                self.observer.info(&format!(
                    "Committed {} executed, {} recorded",
                    run.executed_count, run.recorded_count
                ));
                Ok(true)
            }
            CompletionDecision::Rollback => {
                tx.rollback()?;
                self.observer.info(&format!(
                    "Rolled back {} executed, {} recorded",
                    run.executed_count, run.recorded_count
                ));
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;

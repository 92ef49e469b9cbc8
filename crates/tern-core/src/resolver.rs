//! State resolution: cross-reference the catalogue against the ledger.

use crate::error::CoreResult;
use crate::identifier::{MigrationId, RunnerIdentifier};
use crate::migration::MigrationMap;
use crate::state::{MigrationInfo, MigrationNodeInfo, MigrationState, StateSnapshot};
use crate::store::LedgerStore;
use std::collections::HashSet;

/// Classify every migration in `map` against a set of executed identifiers.
///
/// A migration is [`MigrationState::Applied`] when its identifier is in
/// `executed`, regardless of the node it was recorded under.
pub fn classify<'a>(map: &'a MigrationMap, executed: &HashSet<MigrationId>) -> StateSnapshot<'a> {
    let nodes = map
        .nodes()
        .iter()
        .map(|node| {
            let migrations = node
                .migrations()
                .map(|migration| {
                    let state = if executed.contains(migration.id().as_str()) {
                        MigrationState::Applied
                    } else {
                        MigrationState::Pending
                    };
                    MigrationInfo::new(migration, state)
                })
                .collect();
            MigrationNodeInfo::new(node, migrations)
        })
        .collect();
    StateSnapshot::new(nodes)
}

/// Read the ledger for `runner` and classify `map` against it.
///
/// Reads the ledger on every call. Store failures are returned unchanged.
pub fn resolve_state<'a, S>(
    store: &S,
    map: &'a MigrationMap,
    runner: &RunnerIdentifier,
) -> CoreResult<StateSnapshot<'a>>
where
    S: LedgerStore + ?Sized,
{
    let executed = store.list_executed_migrations(runner)?;
    log::debug!(
        "Ledger for '{}' has {} executed migration(s)",
        runner,
        executed.len()
    );
    Ok(classify(map, &executed))
}

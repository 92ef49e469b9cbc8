//! Filter chain: pluggable policies that prune the snapshot before execution.
//!
//! Filters run strictly in registration order and all of them finish before
//! the first script executes. Each sees the pruning of the filters before it.

use crate::identifier::{MigrationId, NodeId};
use crate::state::StateSnapshot;
use std::collections::HashSet;

/// A policy that removes nodes or migrations from a run.
pub trait MigrationFilter {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Prune `snapshot` in place.
    fn filter(&mut self, snapshot: &mut StateSnapshot<'_>);

    /// Called once after the unit of work finished, with whether it was
    /// committed.
    fn after_transaction(&mut self, _committed: bool) {}
}

/// Ordered list of filters.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn MigrationFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter after all previously registered ones.
    pub fn push(&mut self, filter: Box<dyn MigrationFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every filter over `snapshot` in registration order.
    pub fn apply(&mut self, snapshot: &mut StateSnapshot<'_>) {
        for filter in &mut self.filters {
            let before = snapshot.pending_count();
            filter.filter(snapshot);
            log::debug!(
                "Filter '{}' left {} of {} pending migration(s)",
                filter.name(),
                snapshot.pending_count(),
                before
            );
        }
    }

    /// Notify every filter, in registration order, of the transaction outcome.
    pub fn after_transaction(&mut self, committed: bool) {
        for filter in &mut self.filters {
            filter.after_transaction(committed);
        }
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

/// Keep only the listed nodes.
#[derive(Debug, Clone)]
pub struct NodeSelection {
    nodes: Vec<NodeId>,
}

impl NodeSelection {
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }
}

impl MigrationFilter for NodeSelection {
    fn name(&self) -> &str {
        "node-selection"
    }

    fn filter(&mut self, snapshot: &mut StateSnapshot<'_>) {
        for wanted in &self.nodes {
            if snapshot.node(wanted).is_none() {
                log::warn!("Selected node '{}' is not in the catalogue", wanted);
            }
        }
        let nodes = &self.nodes;
        snapshot.retain_nodes(|node| nodes.iter().any(|n| n == node.id()));
    }
}

/// Remove the listed migrations from every node.
#[derive(Debug, Clone)]
pub struct ExcludeMigrations {
    ids: HashSet<MigrationId>,
}

impl ExcludeMigrations {
    pub fn new(ids: impl IntoIterator<Item = MigrationId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl MigrationFilter for ExcludeMigrations {
    fn name(&self) -> &str {
        "exclude-migrations"
    }

    fn filter(&mut self, snapshot: &mut StateSnapshot<'_>) {
        let ids = &self.ids;
        snapshot.retain_migrations(|_, migration| !ids.contains(migration.id()));
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;

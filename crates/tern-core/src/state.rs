//! Per-run classification of migrations.
//!
//! A [`StateSnapshot`] is built by the resolver, handed by `&mut` through the
//! filter chain, and then consumed by the engine. It is the only channel
//! between filters and the engine, so the order in which filters run matters.
//!
//! The snapshot can only shrink: nodes and migrations can be removed, but not
//! added, reordered, or reclassified.

use crate::identifier::{MigrationId, NodeId};
use crate::migration::{Migration, MigrationNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a migration is already recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    /// Not yet recorded for this runner identifier
    Pending,
    /// Recorded in the ledger for this runner identifier
    Applied,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationState::Pending => write!(f, "pending"),
            MigrationState::Applied => write!(f, "applied"),
        }
    }
}

/// A migration together with its classification.
#[derive(Debug, Clone, Copy)]
pub struct MigrationInfo<'a> {
    migration: &'a dyn Migration,
    state: MigrationState,
}

impl<'a> MigrationInfo<'a> {
    pub(crate) fn new(migration: &'a dyn Migration, state: MigrationState) -> Self {
        Self { migration, state }
    }

    /// The catalogue migration.
    pub fn migration(&self) -> &'a dyn Migration {
        self.migration
    }

    /// Shorthand for `migration().id()`.
    pub fn id(&self) -> &'a MigrationId {
        self.migration.id()
    }

    /// Classification relative to the ledger.
    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Whether the engine will consider this migration.
    pub fn is_pending(&self) -> bool {
        self.state == MigrationState::Pending
    }
}

/// A node and the classified migrations that remain in it.
#[derive(Debug, Clone)]
pub struct MigrationNodeInfo<'a> {
    node: &'a MigrationNode,
    migrations: Vec<MigrationInfo<'a>>,
}

impl<'a> MigrationNodeInfo<'a> {
    pub(crate) fn new(node: &'a MigrationNode, migrations: Vec<MigrationInfo<'a>>) -> Self {
        Self { node, migrations }
    }

    /// Node identifier.
    pub fn id(&self) -> &'a NodeId {
        self.node.id()
    }

    /// Migrations still in the snapshot, in catalogue order.
    pub fn migrations(&self) -> &[MigrationInfo<'a>] {
        &self.migrations
    }

    /// Pending migrations still in the snapshot, in catalogue order.
    pub fn pending(&self) -> impl Iterator<Item = &MigrationInfo<'a>> {
        self.migrations.iter().filter(|m| m.is_pending())
    }

    /// Remove a migration by identifier. Returns whether anything was removed.
    pub fn remove_migration(&mut self, id: &str) -> bool {
        let before = self.migrations.len();
        self.migrations.retain(|m| m.id() != id);
        self.migrations.len() != before
    }

    /// Keep only migrations for which `keep` returns true.
    pub fn retain_migrations<F>(&mut self, mut keep: F)
    where
        F: FnMut(&MigrationInfo<'a>) -> bool,
    {
        self.migrations.retain(|m| keep(m));
    }
}

/// Classification of every migration in a run, in catalogue order.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot<'a> {
    nodes: Vec<MigrationNodeInfo<'a>>,
}

impl<'a> StateSnapshot<'a> {
    pub(crate) fn new(nodes: Vec<MigrationNodeInfo<'a>>) -> Self {
        Self { nodes }
    }

    /// Nodes still in the snapshot, in catalogue order.
    pub fn nodes(&self) -> &[MigrationNodeInfo<'a>] {
        &self.nodes
    }

    /// Look up a node by identifier.
    pub fn node(&self, id: &str) -> Option<&MigrationNodeInfo<'a>> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    /// Look up a node by identifier for in-place pruning.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut MigrationNodeInfo<'a>> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    /// Remove a node and all its migrations. Returns whether it was present.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id() != id);
        self.nodes.len() != before
    }

    /// Keep only nodes for which `keep` returns true.
    pub fn retain_nodes<F>(&mut self, mut keep: F)
    where
        F: FnMut(&MigrationNodeInfo<'a>) -> bool,
    {
        self.nodes.retain(|n| keep(n));
    }

    /// Remove one migration from one node. Returns whether it was present.
    pub fn remove_migration(&mut self, node: &str, migration: &str) -> bool {
        self.node_mut(node)
            .map(|n| n.remove_migration(migration))
            .unwrap_or(false)
    }

    /// Keep only migrations for which `keep(node_id, migration)` returns true,
    /// across every node.
    pub fn retain_migrations<F>(&mut self, mut keep: F)
    where
        F: FnMut(&NodeId, &MigrationInfo<'a>) -> bool,
    {
        for node in &mut self.nodes {
            let node_id = node.id();
            node.retain_migrations(|m| keep(node_id, m));
        }
    }

    /// Iterate `(node, migration)` pairs in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a NodeId, &MigrationInfo<'a>)> {
        self.nodes
            .iter()
            .flat_map(|n| n.migrations.iter().map(move |m| (n.id(), m)))
    }

    /// Number of pending migrations still in the snapshot.
    pub fn pending_count(&self) -> usize {
        self.iter().filter(|(_, m)| m.is_pending()).count()
    }

    /// Number of applied migrations still in the snapshot.
    pub fn applied_count(&self) -> usize {
        self.iter().filter(|(_, m)| !m.is_pending()).count()
    }

    /// Whether no migrations remain.
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|n| n.migrations.is_empty())
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

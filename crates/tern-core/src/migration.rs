//! Catalogue data model: migrations, nodes, and the migration map.
//!
//! These types are produced fresh for every run by a
//! [`CatalogueProvider`](crate::catalogue::CatalogueProvider) and are read-only
//! to the engine.

use crate::error::CoreResult;
use crate::identifier::{MigrationId, NodeId, RunnerIdentifier};
use std::fmt;

/// A single named unit of schema change.
///
/// The upgrade script is produced on demand and may differ between calls (for
/// example when it is rendered from a template). The engine asks for it at
/// most once per run.
pub trait Migration {
    /// Identifier of this migration, unique across the whole catalogue.
    fn id(&self) -> &MigrationId;

    /// Produce the SQL text that upgrades the database.
    fn upgrade_sql(&self) -> CoreResult<String>;
}

impl fmt::Debug for dyn Migration + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Migration")
            .field(&self.id().as_str())
            .finish()
    }
}

/// A migration whose script is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    id: MigrationId,
    sql: String,
}

impl SqlMigration {
    /// Create a migration from an identifier and its upgrade script.
    pub fn new(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: MigrationId::new(id),
            sql: sql.into(),
        }
    }
}

impl Migration for SqlMigration {
    fn id(&self) -> &MigrationId {
        &self.id
    }

    fn upgrade_sql(&self) -> CoreResult<String> {
        Ok(self.sql.clone())
    }
}

/// An ordered group of migrations.
///
/// Order within the node is the order in which migrations were pushed and is
/// the order in which they execute.
#[derive(Debug)]
pub struct MigrationNode {
    id: NodeId,
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationNode {
    /// Create an empty node.
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_id(NodeId::new(id))
    }

    /// Create an empty node from an already validated identifier.
    pub fn from_id(id: NodeId) -> Self {
        Self {
            id,
            migrations: Vec::new(),
        }
    }

    /// Append a migration, builder style.
    pub fn with_migration(mut self, migration: impl Migration + 'static) -> Self {
        self.push(migration);
        self
    }

    /// Append a migration.
    pub fn push(&mut self, migration: impl Migration + 'static) {
        self.migrations.push(Box::new(migration));
    }

    /// Append an already boxed migration.
    pub fn push_boxed(&mut self, migration: Box<dyn Migration>) {
        self.migrations.push(migration);
    }

    /// Node identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Migrations in execution order.
    pub fn migrations(&self) -> impl Iterator<Item = &dyn Migration> {
        self.migrations.iter().map(|m| m.as_ref())
    }

    /// Number of migrations in this node.
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Whether this node has no migrations.
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

/// The full catalogue for one run: ordered nodes plus an optional identifier.
///
/// When `identifier` is set it takes precedence over the identifier the
/// [`Migrator`](crate::engine::Migrator) was constructed with.
#[derive(Debug, Default)]
pub struct MigrationMap {
    identifier: Option<RunnerIdentifier>,
    nodes: Vec<MigrationNode>,
}

impl MigrationMap {
    /// Create an empty map without an identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the map identifier, builder style.
    pub fn with_identifier(mut self, identifier: RunnerIdentifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Append a node, builder style.
    pub fn with_node(mut self, node: MigrationNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append a node.
    pub fn push(&mut self, node: MigrationNode) {
        self.nodes.push(node);
    }

    /// Identifier supplied by the catalogue, if any.
    pub fn identifier(&self) -> Option<&RunnerIdentifier> {
        self.identifier.as_ref()
    }

    /// Nodes in execution order.
    pub fn nodes(&self) -> &[MigrationNode] {
        &self.nodes
    }

    /// Total number of migrations across all nodes.
    pub fn migration_count(&self) -> usize {
        self.nodes.iter().map(MigrationNode::len).sum()
    }
}

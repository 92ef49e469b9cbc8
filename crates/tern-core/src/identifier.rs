//! Strongly-typed identifiers for nodes, migrations, and ledger scopes.

use crate::newtype_string::define_identifier;

define_identifier! {
    /// Identifier of a migration, unique across all nodes of a catalogue.
    pub struct MigrationId;
}

define_identifier! {
    /// Identifier of a migration node.
    pub struct NodeId;
}

define_identifier! {
    /// Namespace under which applied migrations are tracked in the ledger.
    ///
    /// Two runners with different identifiers can migrate the same database
    /// independently.
    pub struct RunnerIdentifier;
}

#[cfg(test)]
#[path = "identifier_test.rs"]
mod tests;

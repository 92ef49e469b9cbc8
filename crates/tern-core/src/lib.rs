//! tern-core - Core library for Tern
//!
//! This crate provides the migration catalogue model, ledger state resolution,
//! the filter chain, decision policies, the ledger store contract, and the
//! execution engine, plus tern.yml configuration and the directory catalogue.
//! Database drivers and script templating live in their own crates and plug in
//! through [`LedgerStore`] and [`ScriptRenderer`].

pub mod catalogue;
pub mod checksum;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod filter;
pub mod identifier;
pub mod migration;
mod newtype_string;
pub mod observer;
pub mod report;
pub mod resolver;
pub mod state;
pub mod store;
pub mod test_utils;

pub use catalogue::{CatalogueProvider, DirectoryCatalogue, FileMigration, ScriptRenderer};
pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig, DbType, PolicyConfig, TargetConfig};
pub use decision::{
    CommitPolicy, CompletionDecision, CompletionPolicy, ErrorDecision, ErrorPolicy,
    PreExecutionDecision, PreExecutionPolicy, SkipListed, StopAfter,
};
pub use engine::Migrator;
pub use error::{CoreError, CoreResult, StoreError, StoreResult};
pub use filter::{ExcludeMigrations, FilterChain, MigrationFilter, NodeSelection};
pub use identifier::{MigrationId, NodeId, RunnerIdentifier};
pub use migration::{Migration, MigrationMap, MigrationNode, SqlMigration};
pub use observer::{LogObserver, MigrationObserver, NullObserver};
pub use report::{MigrationOutcome, MigrationReport, OutcomeStatus};
pub use resolver::{classify, resolve_state};
pub use state::{MigrationInfo, MigrationNodeInfo, MigrationState, StateSnapshot};
pub use store::{LedgerEntry, LedgerStore, LedgerTransaction};

//! Error types for tern-core

use thiserror::Error;

/// Core error type for Tern
#[derive(Error, Debug)]
pub enum CoreError {
    /// T001: Neither the catalogue nor the runner supplied an identifier
    #[error("[T001] No runner identifier: set `runner_identifier` in tern.yml, pass --identifier, or declare `identifier` in catalogue.yml")]
    MissingRunnerIdentifier,

    /// T002: Ledger store failure (listing, inserting, bootstrapping, committing)
    #[error("[T002] Ledger store failure: {0}")]
    Store(#[from] StoreError),

    /// T003: A decision name did not match any known decision
    #[error("[T003] Unimplemented {hook} decision '{value}'. Expected one of: {expected}")]
    UnimplementedDecision {
        hook: &'static str,
        value: String,
        expected: &'static str,
    },

    /// T004: A migration could not produce its upgrade script
    #[error("[T004] Failed to resolve script for migration '{migration}': {message}")]
    ScriptResolution { migration: String, message: String },

    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C001: Migrations directory not found
    #[error("[C001] Migrations directory not found: {path}")]
    CatalogueNotFound { path: String },

    /// C002: catalogue.yml names a node directory that does not exist
    #[error("[C002] Node '{node}' listed in catalogue.yml has no directory under {path}")]
    UnknownCatalogueNode { node: String, path: String },

    /// C003: A node directory exists but catalogue.yml does not list it
    #[error("[C003] Node directory '{node}' is not listed in catalogue.yml. Add it to `nodes` or remove the directory")]
    UnlistedCatalogueNode { node: String },

    /// C004: Same node listed twice in catalogue.yml
    #[error("[C004] Duplicate node '{node}' in catalogue.yml")]
    DuplicateNode { node: String },

    /// C005: Directory or file name is not usable as an identifier
    #[error("[C005] Invalid catalogue entry at '{path}': {reason}")]
    InvalidCatalogueEntry { path: String, reason: String },

    /// C006: Same migration id in two nodes; the ledger tracks migrations by id
    #[error("[C006] Migration '{migration}' in node '{node}' is already defined in node '{first_node}'. Migration ids must be unique across nodes")]
    DuplicateMigration {
        migration: String,
        node: String,
        first_node: String,
    },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by a [`crate::store::LedgerStore`] implementation.
///
/// `Execution` is the only kind the engine treats as recoverable: it is what a
/// failing migration script produces, and it is handed to the error policy.
/// Every other kind aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// S001: Could not reach the database
    #[error("[S001] Database connection failed: {0}")]
    Connection(String),

    /// S002: A SQL script failed
    #[error("[S002] SQL execution failed: {0}")]
    Execution(String),

    /// S003: Bookkeeping table could not be created or queried
    #[error("[S003] Ledger operation failed: {0}")]
    Ledger(String),

    /// S004: BEGIN / COMMIT / ROLLBACK failed
    #[error("[S004] Transaction failed: {0}")]
    Transaction(String),
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;

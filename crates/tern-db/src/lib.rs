//! tern-db - DuckDB ledger store for Tern
//!
//! [`DuckDbLedger`] implements the core [`LedgerStore`](tern_core::LedgerStore)
//! contract: it bootstraps the `<schema>.executed_migrations` table, answers
//! which migrations a runner has applied, and runs a whole migration session
//! inside one DuckDB transaction.

pub mod duckdb;
pub mod error;
mod schema;

pub use crate::duckdb::{DuckDbLedger, DuckDbTransaction};
pub use error::{DbError, DbResult};

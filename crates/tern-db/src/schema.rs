//! Versioned DDL for the ledger schema.
//!
//! Applied versions are tracked in `<schema>.schema_version`; every call to
//! [`upgrade`] runs the versions that are not there yet, so an existing
//! ledger is brought forward without losing rows.

use crate::error::{DbError, DbResult};
use duckdb::Connection;

/// Name of the ledger table inside the ledger schema.
pub(crate) const LEDGER_TABLE: &str = "executed_migrations";

struct LedgerDdl {
    version: i32,
    /// `{schema}` is replaced with the ledger schema name.
    sql: &'static str,
}

const LEDGER_DDL: &[LedgerDdl] = &[LedgerDdl {
    version: 1,
    sql: "CREATE TABLE IF NOT EXISTS {schema}.executed_migrations (
              runner_identifier VARCHAR   NOT NULL,
              migration_node_id VARCHAR   NOT NULL,
              migration_id      VARCHAR   NOT NULL,
              last_run_script   VARCHAR   NOT NULL,
              last_run_date     TIMESTAMP NOT NULL,
              PRIMARY KEY (runner_identifier, migration_node_id, migration_id)
          );",
}];

/// Whether `schema` can be spliced into DDL unquoted.
pub(crate) fn is_valid_schema_name(schema: &str) -> bool {
    !schema.is_empty()
        && schema
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !schema.starts_with(|c: char| c.is_ascii_digit())
}

fn ensure_version_table(conn: &Connection, schema: &str) -> DbResult<()> {
    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {schema};
         CREATE TABLE IF NOT EXISTS {schema}.schema_version (
             version    INTEGER   NOT NULL,
             applied_at TIMESTAMP NOT NULL DEFAULT now()
         );"
    ))
    .map_err(|e| DbError::LedgerError(format!("failed to create schema_version table: {e}")))
}

/// Highest applied ledger DDL version, or 0.
pub(crate) fn current_version(conn: &Connection, schema: &str) -> DbResult<i32> {
    conn.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {schema}.schema_version"),
        [],
        |row| row.get(0),
    )
    .map_err(|e| DbError::LedgerError(format!("failed to read ledger schema version: {e}")))
}

/// Latest ledger DDL version this build knows about.
pub(crate) fn latest_version() -> i32 {
    LEDGER_DDL.last().map(|d| d.version).unwrap_or(0)
}

/// Create or upgrade the ledger schema. Safe to call on every run.
pub(crate) fn upgrade(conn: &Connection, schema: &str) -> DbResult<()> {
    ensure_version_table(conn, schema)?;
    let current = current_version(conn, schema)?;

    for ddl in LEDGER_DDL.iter().filter(|d| d.version > current) {
        log::debug!("Applying ledger schema v{:03} in '{schema}'", ddl.version);
        conn.execute_batch(&ddl.sql.replace("{schema}", schema))
            .map_err(|e| {
                DbError::LedgerError(format!("ledger schema v{:03} failed: {e}", ddl.version))
            })?;
        conn.execute(
            &format!("INSERT INTO {schema}.schema_version (version) VALUES (?)"),
            duckdb::params![ddl.version],
        )
        .map_err(|e| {
            DbError::LedgerError(format!(
                "failed to record ledger schema v{:03}: {e}",
                ddl.version
            ))
        })?;
    }
    Ok(())
}

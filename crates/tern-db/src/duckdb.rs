//! DuckDB ledger store implementation

use crate::error::{DbError, DbResult};
use crate::schema::{self, LEDGER_TABLE};
use chrono::NaiveDateTime;
use duckdb::Connection;
use std::collections::HashSet;
use std::path::Path;
use tern_core::{
    LedgerEntry, LedgerStore, LedgerTransaction, MigrationId, NodeId, RunnerIdentifier,
    StoreResult,
};

/// Timestamp layout used to move `last_run_date` through SQL as text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Ledger store backed by a single DuckDB connection.
///
/// Single-threaded: a migration session runs sequentially on one connection,
/// so no `Mutex` is needed.
pub struct DuckDbLedger {
    conn: Connection,
    schema: String,
}

impl DuckDbLedger {
    /// Open (or create) a DuckDB file.
    pub fn open(path: &Path, schema: &str) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Self::with_connection(conn, schema)
    }

    /// Create an in-memory database.
    pub fn open_memory(schema: &str) -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Self::with_connection(conn, schema)
    }

    /// Open from a path string (handles the `:memory:` special case).
    pub fn new(path: &str, schema: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::open_memory(schema)
        } else {
            Self::open(Path::new(path), schema)
        }
    }

    /// Wrap an existing connection.
    pub fn with_connection(conn: Connection, schema: &str) -> DbResult<Self> {
        if !schema::is_valid_schema_name(schema) {
            return Err(DbError::InvalidSchema(schema.to_string()));
        }
        Ok(Self {
            conn,
            schema: schema.to_string(),
        })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Schema that holds the ledger table.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Applied ledger DDL version. Fails until the ledger has been bootstrapped.
    pub fn schema_version(&self) -> DbResult<i32> {
        schema::current_version(&self.conn, &self.schema)
    }

    fn table(&self) -> String {
        format!("{}.{}", self.schema, LEDGER_TABLE)
    }

    fn query_entries(&self, runner: &RunnerIdentifier) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT runner_identifier, migration_node_id, migration_id, last_run_script,
                    strftime(last_run_date, '%Y-%m-%d %H:%M:%S.%f')
             FROM {}
             WHERE runner_identifier = ?
             ORDER BY last_run_date, migration_node_id, migration_id",
            self.table()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DbError::LedgerError(e.to_string()))?;
        let rows = stmt
            .query_map(duckdb::params![runner.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e| DbError::LedgerError(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let (runner_id, node, migration, script, date) =
                row.map_err(|e| DbError::LedgerError(e.to_string()))?;
            entries.push(LedgerEntry {
                runner_identifier: parse_identifier(runner_id, RunnerIdentifier::try_new)?,
                migration_node_id: parse_identifier(node, NodeId::try_new)?,
                migration_id: parse_identifier(migration, MigrationId::try_new)?,
                last_run_script: script,
                last_run_date: NaiveDateTime::parse_from_str(&date, TIMESTAMP_FORMAT)
                    .map_err(|e| {
                        DbError::LedgerError(format!("unreadable last_run_date '{date}': {e}"))
                    })?
                    .and_utc(),
            });
        }
        Ok(entries)
    }

    fn query_executed(&self, runner: &RunnerIdentifier) -> DbResult<HashSet<MigrationId>> {
        let sql = format!(
            "SELECT migration_id FROM {} WHERE runner_identifier = ?",
            self.table()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DbError::LedgerError(e.to_string()))?;
        let rows = stmt
            .query_map(duckdb::params![runner.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| DbError::LedgerError(e.to_string()))?;

        let mut executed = HashSet::new();
        for row in rows {
            let id = row.map_err(|e| DbError::LedgerError(e.to_string()))?;
            executed.insert(parse_identifier(id, MigrationId::try_new)?);
        }
        Ok(executed)
    }
}

fn parse_identifier<T>(raw: String, parse: fn(String) -> Option<T>) -> DbResult<T> {
    parse(raw).ok_or_else(|| DbError::LedgerError("blank identifier in ledger row".to_string()))
}

impl LedgerStore for DuckDbLedger {
    type Transaction<'a> = DuckDbTransaction<'a>;

    fn upgrade_schema(&self) -> StoreResult<()> {
        Ok(schema::upgrade(&self.conn, &self.schema)?)
    }

    fn list_executed_migrations(
        &self,
        runner: &RunnerIdentifier,
    ) -> StoreResult<HashSet<MigrationId>> {
        Ok(self.query_executed(runner)?)
    }

    fn ledger_entries(&self, runner: &RunnerIdentifier) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self.query_entries(runner)?)
    }

    fn begin(&self) -> StoreResult<DuckDbTransaction<'_>> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(DuckDbTransaction {
            ledger: self,
            finished: false,
        })
    }
}

/// An open DuckDB transaction.
///
/// Dropping it without calling [`commit`](LedgerTransaction::commit) or
/// [`rollback`](LedgerTransaction::rollback) rolls back.
///
/// A statement rejected before it runs (parser or binder errors such as a
/// missing table) leaves the transaction usable. A statement that fails while
/// running (constraint violations, conversion errors) aborts the transaction:
/// every later statement, ledger inserts included, fails until it is rolled
/// back.
pub struct DuckDbTransaction<'a> {
    ledger: &'a DuckDbLedger,
    finished: bool,
}

impl LedgerTransaction for DuckDbTransaction<'_> {
    fn execute_sql(&mut self, sql: &str) -> StoreResult<()> {
        self.ledger
            .conn
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()).into())
    }

    fn insert_executed_migration(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (runner_identifier, migration_node_id, migration_id, last_run_script, last_run_date)
             VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP))",
            self.ledger.table()
        );
        let date = entry.last_run_date.format(TIMESTAMP_FORMAT).to_string();
        self.ledger
            .conn
            .execute(
                &sql,
                duckdb::params![
                    entry.runner_identifier.as_str(),
                    entry.migration_node_id.as_str(),
                    entry.migration_id.as_str(),
                    entry.last_run_script,
                    date,
                ],
            )
            .map_err(|e| {
                DbError::LedgerError(format!(
                    "failed to record '{}/{}': {e}",
                    entry.migration_node_id, entry.migration_id
                ))
            })?;
        Ok(())
    }

    fn commit(mut self) -> StoreResult<()> {
        self.finished = true;
        if let Err(commit_err) = self.ledger.conn.execute_batch("COMMIT") {
            let _ = self.ledger.conn.execute_batch("ROLLBACK");
            return Err(DbError::TransactionError(format!("COMMIT failed: {commit_err}")).into());
        }
        Ok(())
    }

    fn rollback(mut self) -> StoreResult<()> {
        self.finished = true;
        self.ledger
            .conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")).into())
    }
}

impl Drop for DuckDbTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.ledger.conn.execute_batch("ROLLBACK") {
            log::warn!("Rollback of abandoned transaction failed: {e}");
        }
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;

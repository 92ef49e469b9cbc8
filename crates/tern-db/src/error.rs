//! Error types for tern-db

use tern_core::StoreError;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Ledger bookkeeping error (D003)
    #[error("[D003] Ledger operation failed: {0}")]
    LedgerError(String),

    /// BEGIN / COMMIT / ROLLBACK error (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Ledger schema name is not a plain identifier (D005)
    #[error("[D005] Invalid ledger schema name '{0}': use letters, digits, and underscores")]
    InvalidSchema(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionError(msg) => StoreError::Connection(msg),
            DbError::ExecutionError(msg) => StoreError::Execution(msg),
            DbError::LedgerError(msg) => StoreError::Ledger(msg),
            DbError::TransactionError(msg) => StoreError::Transaction(msg),
            DbError::InvalidSchema(name) => {
                StoreError::Ledger(format!("invalid ledger schema name '{name}'"))
            }
        }
    }
}

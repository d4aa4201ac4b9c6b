//! Error types for the store.

use crate::encryption::TransformError;
use cv_core::CoreError;
use cv_crypto::CryptoError;
use thiserror::Error;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open or create the database (S001).
    #[error("[S001] Database connection failed: {0}")]
    ConnectionError(String),

    /// A migration statement failed; the whole run was rolled back (S002).
    #[error("[S002] Migration to version {version} failed to execute statement:\n{statement}\n{message}")]
    Migration {
        version: i64,
        statement: String,
        message: String,
    },

    /// Requested target version is not in the registry (S003).
    #[error("[S003] Target schema version {target} is beyond the latest known version {latest}")]
    InvalidTarget { target: i64, latest: i64 },

    /// Registry versions are not contiguous from 1 (S004).
    #[error("[S004] Invalid migration registry: {0}")]
    InvalidRegistry(String),

    /// Referenced table does not exist (S005).
    #[error("[S005] Table not found: {0}")]
    TableNotFound(String),

    /// Transaction management error (S006).
    #[error("[S006] Transaction failed: {0}")]
    TransactionError(String),

    /// Settings row missing or unreadable (S007).
    #[error("[S007] Settings error: {0}")]
    Settings(String),

    /// A field could not be transformed under the fail-fast policy (S008).
    #[error("[S008] Failed to transform {path} for row [{row}]: {source}")]
    Transform {
        path: String,
        row: String,
        source: TransformError,
    },

    /// Configuration or identifier error (S009).
    #[error("[S009] {0}")]
    Core(#[from] CoreError),

    /// Key or cipher error (S010).
    #[error("[S010] {0}")]
    Crypto(#[from] CryptoError),

    /// DuckDB driver error with preserved source chain (S011).
    #[error("[S011] DuckDB error: {0}")]
    DuckDb(#[source] duckdb::Error),

    /// An UPDATE addressed by rowid did not hit exactly one row (S012).
    #[error("[S012] Rewriting {table} row [{row}] affected {affected} rows instead of 1")]
    RowIdentity {
        table: String,
        row: String,
        affected: usize,
    },

    /// The ledger lists columns the decrypt pass was not given (S013).
    #[error("[S013] Encrypted columns not covered by the configured column set: {0}")]
    UncoveredColumns(String),

    /// A new row targets an encrypted column but no key was supplied (S014).
    #[error("[S014] Column {0} is encrypted; a key is required to write it")]
    KeyRequired(String),
}

/// Result type alias for [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured catalog error variants, so
        // missing relations are recognised by message.
        let msg = err.to_string();
        if is_missing_table(&msg) {
            StoreError::TableNotFound(msg)
        } else {
            StoreError::DuckDb(err)
        }
    }
}

pub(crate) fn is_missing_table(msg: &str) -> bool {
    msg.contains("Table with name")
        || msg.contains("Table or view with name")
        || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
}

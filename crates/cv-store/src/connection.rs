//! Store connection wrapper.
//!
//! [`Store`] owns a DuckDB [`Connection`] and provides helpers for opening,
//! transacting, and running ledger-backed encryption passes against it.

use crate::encryption::{EncryptionEngine, PassReport, TableEncryptionSpec};
use crate::error::{StoreError, StoreResult};
use crate::ledger::EncryptionLedger;
use crate::migration::current_version;
use crate::settings::{get_settings, save_settings};
use cv_core::config::IN_MEMORY_PATH;
use duckdb::Connection;
use std::path::Path;

/// Wrapper around a DuckDB connection.
///
/// Single-threaded: migrations and rotations are run-to-completion operations
/// that own the connection exclusively.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path`. `:memory:` opens an
    /// in-memory database.
    ///
    /// No migrations are run; see [`crate::migration::setup_db`].
    pub fn open(path: &Path) -> StoreResult<Self> {
        if path.as_os_str() == IN_MEMORY_PATH {
            return Self::open_memory();
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::ConnectionError(format!("{e}: {}", path.display())))?;
        log::debug!("Opened database {}", path.display());
        Ok(Self { conn })
    }

    /// Create an empty in-memory database.
    pub fn open_memory() -> StoreResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error.
    pub fn transaction<F, T>(&self, body: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| StoreError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&self.conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(StoreError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(e) => {
                log::debug!("Rolling back transaction: {e}");
                let _ = self.conn.execute_batch("ROLLBACK");
            }
        }
        result
    }

    /// Highest applied schema version, 0 for a fresh database.
    pub fn current_version(&self) -> StoreResult<i64> {
        current_version(&self.conn)
    }

    /// Current encryption ledger as stored in settings.
    pub fn encryption_ledger(&self) -> StoreResult<EncryptionLedger> {
        let settings = get_settings(&self.conn)?;
        EncryptionLedger::from_settings(&settings)
    }

    /// Encrypt every column in `specs` that the ledger does not list yet and
    /// persist the updated ledger in the same transaction.
    pub fn encrypt_columns(
        &self,
        engine: &EncryptionEngine<'_>,
        specs: &[TableEncryptionSpec],
    ) -> StoreResult<PassReport> {
        self.transaction(|conn| {
            let mut settings = get_settings(conn)?;
            let mut ledger = EncryptionLedger::from_settings(&settings)?;
            let report = engine.encrypt(conn, &mut ledger, specs)?;
            if !report.columns.is_empty() {
                ledger.apply_to(&mut settings);
                save_settings(conn, &settings)?;
            }
            Ok(report)
        })
    }

    /// Decrypt every column the ledger lists and persist the updated ledger
    /// in the same transaction. Fails without writing when `specs` does not
    /// cover the whole ledger.
    pub fn decrypt_columns(
        &self,
        engine: &EncryptionEngine<'_>,
        specs: &[TableEncryptionSpec],
    ) -> StoreResult<PassReport> {
        self.transaction(|conn| {
            let mut settings = get_settings(conn)?;
            let mut ledger = EncryptionLedger::from_settings(&settings)?;
            let report = engine.decrypt_all(conn, &mut ledger, specs)?;
            if !report.columns.is_empty() {
                ledger.apply_to(&mut settings);
                save_settings(conn, &settings)?;
            }
            Ok(report)
        })
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;

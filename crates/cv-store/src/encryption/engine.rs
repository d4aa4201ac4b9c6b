//! Ledger-driven column rewrite.
//!
//! A pass compares each column's ledger membership with the direction of
//! the pass, rewrites only the columns that disagree, and updates the
//! in-memory ledger once every table has been processed. Persisting the
//! ledger is the caller's job, inside the same transaction.

use super::columns::{ColumnSpec, TableEncryptionSpec};
use super::transform::Direction;
use crate::error::{StoreError, StoreResult};
use crate::ledger::EncryptionLedger;
use cv_core::sql_utils::quote_ident;
use cv_core::{ColumnPath, FailurePolicy};
use cv_crypto::Cipher;
use duckdb::types::Value;
use duckdb::Connection;

/// Default number of rows read per page.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Summary of one encrypt or decrypt pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Tables that had at least one pending column.
    pub tables: usize,
    /// Columns whose ledger membership changed.
    pub columns: Vec<ColumnPath>,
    /// Rows written back.
    pub rows_updated: usize,
    /// Fields left untouched after a best-effort failure.
    pub fields_failed: usize,
}

impl PassReport {
    /// True when the pass had nothing to do.
    pub fn is_noop(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Rewrites protected columns with a [`Cipher`].
pub struct EncryptionEngine<'a> {
    cipher: &'a dyn Cipher,
    database: String,
    policy: FailurePolicy,
    batch_size: usize,
}

struct PendingColumn<'s> {
    spec: &'s ColumnSpec,
    path: ColumnPath,
}

impl<'a> EncryptionEngine<'a> {
    /// `database` is the logical name used as the first ledger component.
    pub fn new(cipher: &'a dyn Cipher, database: impl Into<String>) -> Self {
        Self {
            cipher,
            database: database.into(),
            policy: FailurePolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rows per page; values below 1 are treated as 1.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Encrypt every column of `specs` that is not in the ledger yet.
    pub fn encrypt(
        &self,
        conn: &Connection,
        ledger: &mut EncryptionLedger,
        specs: &[TableEncryptionSpec],
    ) -> StoreResult<PassReport> {
        self.run(conn, ledger, specs, Direction::Encrypt)
    }

    /// Decrypt every column of `specs` that the ledger lists.
    pub fn decrypt(
        &self,
        conn: &Connection,
        ledger: &mut EncryptionLedger,
        specs: &[TableEncryptionSpec],
    ) -> StoreResult<PassReport> {
        self.run(conn, ledger, specs, Direction::Decrypt)
    }

    /// Decrypt every column the ledger lists.
    ///
    /// Fails with [`StoreError::UncoveredColumns`] before touching any row
    /// when the ledger names a column that `specs` does not describe, or one
    /// recorded under another database name.
    pub fn decrypt_all(
        &self,
        conn: &Connection,
        ledger: &mut EncryptionLedger,
        specs: &[TableEncryptionSpec],
    ) -> StoreResult<PassReport> {
        let uncovered = self.uncovered_columns(ledger, specs);
        if !uncovered.is_empty() {
            return Err(StoreError::UncoveredColumns(
                uncovered
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
        }
        self.decrypt(conn, ledger, specs)
    }

    /// Ledger entries this engine cannot decrypt with `specs`.
    pub fn uncovered_columns(
        &self,
        ledger: &EncryptionLedger,
        specs: &[TableEncryptionSpec],
    ) -> Vec<ColumnPath> {
        ledger
            .iter()
            .filter(|path| {
                path.database() != self.database
                    || !specs.iter().any(|spec| {
                        spec.table == path.table()
                            && spec.columns.iter().any(|c| c.name == path.column())
                    })
            })
            .cloned()
            .collect()
    }

    /// Encrypt one value bound for `column` of `table`, as a pass would.
    pub fn seal_value(
        &self,
        table: &str,
        column: &ColumnSpec,
        value: &str,
    ) -> StoreResult<String> {
        let path = ColumnPath::new(&self.database, table, &column.name)?;
        column
            .transform
            .apply(self.cipher, Direction::Encrypt, value)
            .map_err(|source| StoreError::Transform {
                path: path.to_string(),
                row: "new row".to_string(),
                source,
            })
    }

    fn run(
        &self,
        conn: &Connection,
        ledger: &mut EncryptionLedger,
        specs: &[TableEncryptionSpec],
        direction: Direction,
    ) -> StoreResult<PassReport> {
        let mut report = PassReport::default();
        let mut converged = Vec::new();

        for spec in specs {
            spec.validate()?;
            let mut pending = Vec::new();
            for column in &spec.columns {
                let path = ColumnPath::new(&self.database, &spec.table, &column.name)?;
                if direction.is_pending(ledger.contains(&path)) {
                    pending.push(PendingColumn { spec: column, path });
                }
            }
            if pending.is_empty() {
                log::debug!("{}: nothing to {direction}", spec.table);
                continue;
            }

            let rows = self.rewrite_table(conn, spec, &pending, direction, &mut report)?;
            log::info!(
                "{direction}: {} column(s) of {} converged, {rows} row(s) updated",
                pending.len(),
                spec.table
            );
            report.tables += 1;
            report.rows_updated += rows;
            converged.extend(pending.into_iter().map(|p| p.path));
        }

        for path in converged {
            match direction {
                Direction::Encrypt => ledger.insert(path.clone()),
                Direction::Decrypt => ledger.remove(&path),
            };
            report.columns.push(path);
        }
        Ok(report)
    }

    /// Page through `spec.table` and write back rows whose protected values
    /// changed. Rows are addressed by DuckDB `rowid`, so tables whose
    /// identifiers repeat are still rewritten row by row; the identifiers
    /// only name rows in errors and logs. Returns the number of rows written.
    fn rewrite_table(
        &self,
        conn: &Connection,
        spec: &TableEncryptionSpec,
        pending: &[PendingColumn<'_>],
        direction: Direction,
        report: &mut PassReport,
    ) -> StoreResult<usize> {
        let table = quote_ident(&spec.table);
        let id_list = spec
            .identifiers
            .iter()
            .map(|i| quote_ident(i))
            .collect::<Vec<_>>()
            .join(", ");
        let col_list = pending
            .iter()
            .map(|p| quote_ident(&p.spec.name))
            .collect::<Vec<_>>()
            .join(", ");
        let id_count = spec.identifiers.len();

        let mut rows_updated = 0;
        let mut offset = 0;
        loop {
            let select = format!(
                "SELECT rowid, {id_list}, {col_list} FROM {table} ORDER BY {id_list}, rowid LIMIT {} OFFSET {offset}",
                self.batch_size
            );
            let page = read_page(conn, &select, id_count, pending.len())?;
            let page_len = page.len();

            for row in page {
                let mut changes: Vec<(&str, String)> = Vec::new();
                for (column, value) in pending.iter().zip(row.values) {
                    let Some(value) = value else { continue };
                    match column.spec.transform.apply(self.cipher, direction, &value) {
                        Ok(transformed) if transformed != value => {
                            changes.push((column.spec.name.as_str(), transformed));
                        }
                        Ok(_) => {}
                        Err(source) => match self.policy {
                            FailurePolicy::FailFast => {
                                return Err(StoreError::Transform {
                                    path: column.path.to_string(),
                                    row: describe_row(&spec.identifiers, &row.ids),
                                    source,
                                });
                            }
                            FailurePolicy::BestEffort => {
                                log::warn!(
                                    "Failed to {direction} {} for row [{}], keeping original value: {source}",
                                    column.path,
                                    describe_row(&spec.identifiers, &row.ids)
                                );
                                report.fields_failed += 1;
                            }
                        },
                    }
                }
                if changes.is_empty() {
                    continue;
                }

                let set_clause = changes
                    .iter()
                    .map(|(name, _)| format!("{} = ?", quote_ident(name)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let update = format!("UPDATE {table} SET {set_clause} WHERE rowid = ?");
                let params = changes
                    .into_iter()
                    .map(|(_, v)| Value::Text(v))
                    .chain(std::iter::once(Value::BigInt(row.rowid)));
                let affected = conn.execute(&update, duckdb::params_from_iter(params))?;
                if affected != 1 {
                    return Err(StoreError::RowIdentity {
                        table: spec.table.clone(),
                        row: describe_row(&spec.identifiers, &row.ids),
                        affected,
                    });
                }
                rows_updated += 1;
            }

            if page_len < self.batch_size {
                break;
            }
            offset += self.batch_size;
        }
        Ok(rows_updated)
    }
}

struct PageRow {
    rowid: i64,
    ids: Vec<Value>,
    values: Vec<Option<String>>,
}

fn read_page(
    conn: &Connection,
    select: &str,
    id_count: usize,
    column_count: usize,
) -> StoreResult<Vec<PageRow>> {
    let mut stmt = conn.prepare(select)?;
    let rows = stmt.query_map([], |row| {
        let rowid = row.get::<_, i64>(0)?;
        let mut ids = Vec::with_capacity(id_count);
        for idx in 1..=id_count {
            ids.push(row.get::<_, Value>(idx)?);
        }
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(row.get::<_, Option<String>>(1 + id_count + idx)?);
        }
        Ok(PageRow { rowid, ids, values })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn describe_row(identifiers: &[String], ids: &[Value]) -> String {
    identifiers
        .iter()
        .zip(ids)
        .map(|(name, value)| match value {
            Value::Text(s) => format!("{name}={s}"),
            other => format!("{name}={other:?}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;

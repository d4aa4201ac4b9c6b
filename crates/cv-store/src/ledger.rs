//! Encryption ledger.
//!
//! A column is encrypted iff its `db.table.column` path is in the ledger.
//! The durable form is `Settings::encrypted_items`; writes go through
//! [`persist_ledger`] inside the same transaction as the row rewrite that
//! produced them.

use crate::error::StoreResult;
use crate::settings::{get_settings, save_settings, Settings};
use cv_core::ColumnPath;
use duckdb::Connection;
use std::collections::BTreeSet;

/// Set of currently encrypted columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionLedger {
    columns: BTreeSet<ColumnPath>,
}

impl EncryptionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the ledger out of the settings blob.
    pub fn from_settings(settings: &Settings) -> StoreResult<Self> {
        let columns = settings
            .encrypted_items
            .iter()
            .map(|item| item.parse::<ColumnPath>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { columns })
    }

    pub fn contains(&self, path: &ColumnPath) -> bool {
        self.columns.contains(path)
    }

    /// Returns true if the path was not already present.
    pub fn insert(&mut self, path: ColumnPath) -> bool {
        self.columns.insert(path)
    }

    /// Returns true if the path was present.
    pub fn remove(&mut self, path: &ColumnPath) -> bool {
        self.columns.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnPath> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Write the ledger into `settings.encrypted_items`, sorted.
    pub fn apply_to(&self, settings: &mut Settings) {
        settings.encrypted_items = self.columns.iter().map(ToString::to_string).collect();
    }
}

impl FromIterator<ColumnPath> for EncryptionLedger {
    fn from_iter<I: IntoIterator<Item = ColumnPath>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Read the ledger from the settings row.
pub fn load_ledger(conn: &Connection) -> StoreResult<EncryptionLedger> {
    EncryptionLedger::from_settings(&get_settings(conn)?)
}

/// Replace the persisted ledger, leaving other settings untouched.
pub fn persist_ledger(conn: &Connection, ledger: &EncryptionLedger) -> StoreResult<()> {
    let mut settings = get_settings(conn)?;
    ledger.apply_to(&mut settings);
    save_settings(conn, &settings)
}

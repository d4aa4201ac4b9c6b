//! Fully-qualified `database.table.column` identifiers.
//!
//! The encryption ledger stores these as plain strings inside the settings
//! blob; [`ColumnPath`] is the parsed, ordered form used everywhere else.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A `database.table.column` identifier.
///
/// The database component is a logical name and may contain characters such
/// as `-`; it must not contain `.`. Table and column must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnPath {
    database: String,
    table: String,
    column: String,
}

impl ColumnPath {
    /// Build a path from its three components.
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> CoreResult<Self> {
        let path = Self {
            database: database.into(),
            table: table.into(),
            column: column.into(),
        };
        path.validate()?;
        Ok(path)
    }

    fn validate(&self) -> CoreResult<()> {
        for (part, value) in [
            ("database", &self.database),
            ("table", &self.table),
            ("column", &self.column),
        ] {
            if value.is_empty() {
                return Err(CoreError::InvalidColumnPath {
                    path: self.to_string(),
                    reason: format!("{part} must not be empty"),
                });
            }
            if value.contains('.') {
                return Err(CoreError::InvalidColumnPath {
                    path: self.to_string(),
                    reason: format!("{part} must not contain '.'"),
                });
            }
        }
        Ok(())
    }

    /// Logical database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column name.
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.table, self.column)
    }
}

impl FromStr for ColumnPath {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        let [database, table, column] = parts.as_slice() else {
            return Err(CoreError::InvalidColumnPath {
                path: s.to_string(),
                reason: format!("expected 3 dot-separated parts, found {}", parts.len()),
            });
        };
        Self::new(*database, *table, *column)
    }
}

impl Serialize for ColumnPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColumnPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "column_path_test.rs"]
mod tests;

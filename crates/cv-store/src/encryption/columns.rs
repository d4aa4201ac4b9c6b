//! Protected column sets.

use super::transform::{ColumnTransform, CustomTransform};
use crate::error::StoreResult;
use cv_core::config::{EncryptedTableConfig, EncryptionConfig};
use cv_core::sql_utils::require_plain_ident;
use cv_core::CoreError;

/// One protected column and how its value is rewritten.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub transform: ColumnTransform,
}

impl ColumnSpec {
    /// Seal the whole value.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: ColumnTransform::Plain,
        }
    }

    /// Seal only the listed top-level string fields of a JSON object.
    pub fn json_fields<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            transform: ColumnTransform::JsonFields(fields.into_iter().map(Into::into).collect()),
        }
    }

    pub fn custom(name: impl Into<String>, transform: CustomTransform) -> Self {
        Self {
            name: name.into(),
            transform: ColumnTransform::Custom(transform),
        }
    }
}

/// A table, the columns that identify its rows, and its protected columns.
#[derive(Debug, Clone)]
pub struct TableEncryptionSpec {
    pub table: String,
    pub identifiers: Vec<String>,
    pub columns: Vec<ColumnSpec>,
}

impl TableEncryptionSpec {
    pub fn new<I, S>(table: impl Into<String>, identifiers: I, columns: Vec<ColumnSpec>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            columns,
        }
    }

    /// Build from a `encryption.tables` entry in colvault.yml.
    pub fn from_config(config: &EncryptedTableConfig) -> Self {
        let columns = config
            .columns
            .iter()
            .map(|col| {
                if col.json_fields.is_empty() {
                    ColumnSpec::plain(&col.name)
                } else {
                    ColumnSpec::json_fields(&col.name, col.json_fields.iter().cloned())
                }
            })
            .collect();
        Self::new(&config.table, config.identifiers.iter().cloned(), columns)
    }

    /// Check that every name is safe to interpolate and that identifier and
    /// protected columns are disjoint.
    pub fn validate(&self) -> StoreResult<()> {
        require_plain_ident(&self.table)?;
        if self.identifiers.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: format!("table '{}' has no identifier columns", self.table),
            }
            .into());
        }
        for ident in &self.identifiers {
            require_plain_ident(ident)?;
        }
        for column in &self.columns {
            require_plain_ident(&column.name)?;
            if self.identifiers.contains(&column.name) {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "column '{}.{}' cannot be both an identifier and encrypted",
                        self.table, column.name
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Columns protected by a default installation.
pub fn default_encryption_columns() -> Vec<TableEncryptionSpec> {
    vec![
        TableEncryptionSpec::new(
            "agents",
            ["agent_id"],
            vec![
                ColumnSpec::plain("username"),
                ColumnSpec::plain("password"),
                ColumnSpec::plain("agent_password"),
                ColumnSpec::plain("aws_access_key"),
                ColumnSpec::plain("aws_secret_key"),
                ColumnSpec::json_fields("mysql_options", ["tls_ca", "tls_cert", "tls_key"]),
                ColumnSpec::json_fields("postgresql_options", ["ssl_ca", "ssl_cert", "ssl_key"]),
                ColumnSpec::json_fields(
                    "mongo_db_tls_options",
                    [
                        "tls_ca",
                        "tls_certificate_key",
                        "tls_certificate_key_file_password",
                    ],
                ),
                ColumnSpec::json_fields(
                    "azure_options",
                    ["client_id", "client_secret", "subscription_id", "tenant_id"],
                ),
            ],
        ),
        TableEncryptionSpec::new(
            "sso_details",
            ["client_id"],
            vec![
                ColumnSpec::plain("client_secret"),
                ColumnSpec::plain("access_token"),
            ],
        ),
    ]
}

/// The configured column set: `encryption.tables` when present, otherwise
/// [`default_encryption_columns`].
pub fn resolve_encryption_columns(config: &EncryptionConfig) -> Vec<TableEncryptionSpec> {
    match &config.tables {
        Some(tables) => tables.iter().map(TableEncryptionSpec::from_config).collect(),
        None => default_encryption_columns(),
    }
}

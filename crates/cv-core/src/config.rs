//! Configuration types and parsing for colvault.yml

use crate::error::{CoreError, CoreResult};
use crate::sql_utils::is_plain_ident;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Special database path selecting an in-memory DuckDB instance.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Main configuration from colvault.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Installation name, used in log lines and `cv status`
    pub name: String,

    /// Database location and logical name
    #[serde(default)]
    pub database: DatabaseConfig,

    /// At-rest encryption settings
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Supervised service that owns the database
    #[serde(default)]
    pub service: ServiceConfig,

    /// Migration overrides
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the DuckDB file, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Logical database name; first component of every ledger entry
    #[serde(default = "default_db_name")]
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            name: default_db_name(),
        }
    }
}

/// What to do when a single field fails to encrypt or decrypt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the pass; the enclosing transaction rolls back.
    #[default]
    FailFast,
    /// Log a warning, keep the original value, and continue.
    BestEffort,
}

/// Encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// File holding the active key
    #[serde(default = "default_key_path")]
    pub key_path: String,

    /// Per-field failure handling
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Rows read per page while rewriting a table
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Replaces the bundled encrypted column set when present
    #[serde(default)]
    pub tables: Option<Vec<EncryptedTableConfig>>,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_path: default_key_path(),
            failure_policy: FailurePolicy::default(),
            batch_size: default_batch_size(),
            tables: None,
        }
    }
}

/// One table whose columns are protected at rest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedTableConfig {
    /// Table name
    pub table: String,

    /// Columns that identify a row for UPDATE
    pub identifiers: Vec<String>,

    /// Protected columns
    pub columns: Vec<EncryptedColumnConfig>,
}

/// One protected column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedColumnConfig {
    /// Column name
    pub name: String,

    /// For JSON columns: only these top-level string fields are transformed
    #[serde(default)]
    pub json_fields: Vec<String>,
}

/// Supervised service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Program name known to the supervisor
    #[serde(default = "default_service_name")]
    pub name: String,

    /// supervisorctl executable
    #[serde(default = "default_supervisorctl")]
    pub supervisorctl: String,

    /// How long to wait for the service to reach the requested state
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            supervisorctl: default_supervisorctl(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

/// Migration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Stop at this schema version instead of the latest one
    #[serde(default)]
    pub target_version: Option<i64>,
}

fn default_db_path() -> String {
    "colvault.duckdb".to_string()
}

fn default_db_name() -> String {
    "colvault".to_string()
}

fn default_key_path() -> String {
    "colvault.key".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_service_name() -> String {
    "colvault-server".to_string()
}

fn default_supervisorctl() -> String {
    "supervisorctl".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for colvault.yml or colvault.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("colvault.yml");
        let yaml_path = dir.join("colvault.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if self.database.name.is_empty() || self.database.name.contains('.') {
            return Err(invalid(format!(
                "database.name '{}' must be non-empty and must not contain '.'",
                self.database.name
            )));
        }
        if self.encryption.batch_size == 0 {
            return Err(invalid("encryption.batch_size must be greater than 0"));
        }
        if self.service.name.is_empty() {
            return Err(invalid("service.name cannot be empty"));
        }
        if let Some(target) = self.migration.target_version {
            if target < 0 {
                return Err(invalid(format!(
                    "migration.target_version must not be negative, got {target}"
                )));
            }
        }
        if let Some(tables) = &self.encryption.tables {
            validate_tables(tables)?;
        }
        Ok(())
    }

    /// Absolute path of the database file, or `:memory:` unchanged
    pub fn database_path_absolute(&self, root: &Path) -> PathBuf {
        if self.database.path == IN_MEMORY_PATH {
            PathBuf::from(IN_MEMORY_PATH)
        } else {
            root.join(&self.database.path)
        }
    }

    /// Absolute path of the key file
    pub fn key_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.encryption.key_path)
    }
}

fn validate_tables(tables: &[EncryptedTableConfig]) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for table in tables {
        if !is_plain_ident(&table.table) {
            return Err(invalid(format!(
                "encryption table '{}' is not a plain identifier",
                table.table
            )));
        }
        if !seen.insert(table.table.as_str()) {
            return Err(invalid(format!(
                "encryption table '{}' is listed more than once",
                table.table
            )));
        }
        if table.identifiers.is_empty() {
            return Err(invalid(format!(
                "encryption table '{}' needs at least one identifier column",
                table.table
            )));
        }
        let names = table
            .identifiers
            .iter()
            .chain(table.columns.iter().map(|c| &c.name))
            .chain(table.columns.iter().flat_map(|c| c.json_fields.iter()));
        for name in names {
            if !is_plain_ident(name) {
                return Err(invalid(format!(
                    "'{}' in encryption table '{}' is not a plain identifier",
                    name, table.table
                )));
            }
        }
        if let Some(col) = table
            .columns
            .iter()
            .find(|c| table.identifiers.contains(&c.name))
        {
            return Err(invalid(format!(
                "column '{}' in table '{}' cannot be both an identifier and encrypted",
                col.name, table.table
            )));
        }
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::ConfigInvalid {
        message: message.into(),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

//! Bundled schema migrations.
//!
//! Each version is a numbered `.sql` file embedded via `include_str!` and
//! split into its individual statements. Released files are never edited;
//! schema changes are appended as a new version.

use crate::error::{StoreError, StoreResult};

/// The statements associated with one schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationBatch {
    version: i64,
    statements: Vec<String>,
}

impl MigrationBatch {
    /// Build a batch from an ordered list of statements.
    pub fn new<I, S>(version: i64, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version,
            statements: statements.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a batch from a SQL script with `;`-terminated statements.
    pub fn from_script(version: i64, script: &str) -> Self {
        Self::new(version, split_statements(script))
    }

    /// Schema version this batch brings the database to.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Statements in execution order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

/// Ordered, append-only list of migration batches.
///
/// Versions start at 1 and are contiguous, so batch `v` lives at index
/// `v - 1`.
#[derive(Debug, Clone)]
pub struct MigrationRegistry {
    batches: Vec<MigrationBatch>,
}

impl MigrationRegistry {
    /// Build a registry, validating that versions run `1..=n` in order.
    pub fn new(batches: Vec<MigrationBatch>) -> StoreResult<Self> {
        for (idx, batch) in batches.iter().enumerate() {
            let expected = idx as i64 + 1;
            if batch.version != expected {
                return Err(StoreError::InvalidRegistry(format!(
                    "expected version {expected} at position {idx}, found {}",
                    batch.version
                )));
            }
        }
        Ok(Self { batches })
    }

    /// The schema shipped with this release.
    pub fn bundled() -> Self {
        let batches = BUNDLED
            .iter()
            .enumerate()
            .map(|(idx, script)| MigrationBatch::from_script(idx as i64 + 1, script))
            .collect();
        Self { batches }
    }

    /// Highest version in the registry, 0 when empty.
    pub fn latest_version(&self) -> i64 {
        self.batches.len() as i64
    }

    /// The batch for `version`, if registered.
    pub fn batch(&self, version: i64) -> Option<&MigrationBatch> {
        if version < 1 {
            return None;
        }
        self.batches.get((version - 1) as usize)
    }

    /// All batches in ascending version order.
    pub fn batches(&self) -> &[MigrationBatch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Release schema, one script per version in ascending order.
static BUNDLED: &[&str] = &[
    include_str!("v001_initial.sql"),
    include_str!("v002_aws_credentials.sql"),
    include_str!("v003_agent_options.sql"),
    include_str!("v004_sso_details.sql"),
    include_str!("v005_action_results.sql"),
    include_str!("v006_drop_action_results.sql"),
    include_str!("v007_agent_log_level.sql"),
];

/// Split a script on `;` terminators, skipping blank and comment-only
/// fragments. Quoted literals in the bundled scripts never contain `;`.
fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|stmt| {
            stmt.lines()
                .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
        })
        .map(str::to_string)
        .collect()
}

//! Version tracker and migration runner.
//!
//! Applied versions are recorded one row per version in `schema_migrations`;
//! the current version is `MAX(id)`, or 0 when the table does not exist yet.
//! All pending versions are applied inside a single transaction.

use crate::connection::Store;
use crate::ddl::MigrationRegistry;
use crate::encryption::{EncryptionEngine, PassReport, TableEncryptionSpec};
use crate::error::{StoreError, StoreResult};
use crate::fixtures::{install_fixtures, FixtureSealer, ServerCredentials};
use crate::ledger::{persist_ledger, EncryptionLedger};
use crate::settings::{get_settings, save_settings};
use cv_core::Clock;
use duckdb::Connection;

/// Return the highest applied version, or 0 if the ledger table is missing.
///
/// Must not be called inside a transaction: DuckDB aborts the enclosing
/// transaction when the catalog lookup fails.
pub fn current_version(conn: &Connection) -> StoreResult<i64> {
    let result = conn.query_row(
        "SELECT CAST(COALESCE(MAX(id), 0) AS BIGINT) FROM schema_migrations",
        [],
        |row| row.get::<_, i64>(0),
    );
    match result {
        Ok(version) => Ok(version),
        Err(e) => match StoreError::from(e) {
            StoreError::TableNotFound(_) => Ok(0),
            other => Err(other),
        },
    }
}

/// Apply versions `current + 1 ..= target` on `conn`, recording each one.
///
/// Does not open a transaction; callers wrap this in [`Store::transaction`].
pub fn apply_migrations(
    conn: &Connection,
    registry: &MigrationRegistry,
    current: i64,
    target: i64,
) -> StoreResult<Vec<i64>> {
    let mut applied = Vec::new();
    for version in (current + 1)..=target {
        let batch = registry
            .batch(version)
            .ok_or_else(|| StoreError::InvalidTarget {
                target,
                latest: registry.latest_version(),
            })?;
        log::debug!("Applying migration v{version:03}");

        for statement in batch.statements() {
            conn.execute_batch(statement).map_err(|e| StoreError::Migration {
                version,
                statement: statement.clone(),
                message: e.to_string(),
            })?;
        }

        conn.execute(
            "INSERT INTO schema_migrations (id) VALUES (?)",
            duckdb::params![version],
        )
        .map_err(|e| StoreError::Migration {
            version,
            statement: format!("INSERT INTO schema_migrations (id) VALUES ({version})"),
            message: e.to_string(),
        })?;
        applied.push(version);
    }
    Ok(applied)
}

/// Whether first-time setup steps run after the schema is migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupFixtures {
    Setup,
    Skip,
}

/// Encryption pass run during first-time setup.
pub struct EncryptionTarget<'a> {
    pub engine: EncryptionEngine<'a>,
    pub tables: Vec<TableEncryptionSpec>,
}

/// Inputs to [`setup_db`].
pub struct SetupParams<'a> {
    /// Stop at this version instead of the latest one.
    pub target_version: Option<i64>,
    pub fixtures: SetupFixtures,
    pub server_credentials: Option<ServerCredentials>,
    pub encryption: Option<EncryptionTarget<'a>>,
    pub clock: &'a dyn Clock,
}

impl<'a> SetupParams<'a> {
    /// Migrate to the latest version and install fixtures, without an
    /// encryption pass.
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self {
            target_version: None,
            fixtures: SetupFixtures::Setup,
            server_credentials: None,
            encryption: None,
            clock,
        }
    }

    pub fn target_version(mut self, version: Option<i64>) -> Self {
        self.target_version = version;
        self
    }

    pub fn fixtures(mut self, fixtures: SetupFixtures) -> Self {
        self.fixtures = fixtures;
        self
    }

    pub fn server_credentials(mut self, credentials: ServerCredentials) -> Self {
        self.server_credentials = Some(credentials);
        self
    }

    pub fn encryption(
        mut self,
        engine: EncryptionEngine<'a>,
        tables: Vec<TableEncryptionSpec>,
    ) -> Self {
        self.encryption = Some(EncryptionTarget { engine, tables });
        self
    }
}

/// Result of [`setup_db`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version before the run.
    pub from: i64,
    /// Version after the run.
    pub to: i64,
    /// Versions applied by this run, ascending.
    pub applied: Vec<i64>,
    pub fixtures_installed: bool,
    /// Setup encryption pass, when one ran.
    pub encryption: Option<PassReport>,
}

/// Bring the database to the target version and, on request, run the
/// first-time setup steps.
///
/// Migrations, default settings, fixtures, the encryption pass and the
/// ledger write share one transaction. Setup steps only run once the schema
/// is at the registry's latest version.
pub fn setup_db(
    store: &Store,
    registry: &MigrationRegistry,
    params: SetupParams<'_>,
) -> StoreResult<MigrationReport> {
    let latest = registry.latest_version();
    let target = params.target_version.unwrap_or(latest);
    if target < 0 || target > latest {
        return Err(StoreError::InvalidTarget { target, latest });
    }

    let current = store.current_version()?;
    if target < current {
        log::warn!(
            "Schema is at version {current}, past target {target}; migrations never run backwards"
        );
    }
    let to = current.max(target);
    let run_setup = params.fixtures == SetupFixtures::Setup && to == latest;

    if to == current && !run_setup {
        log::debug!("Schema is up to date at version {current}");
        return Ok(MigrationReport {
            from: current,
            to,
            ..Default::default()
        });
    }

    store.transaction(|conn| {
        let applied = apply_migrations(conn, registry, current, to)?;
        if !applied.is_empty() {
            log::info!("Migrated schema from version {current} to {to}");
        }

        let mut report = MigrationReport {
            from: current,
            to,
            applied,
            ..Default::default()
        };
        if !run_setup {
            return Ok(report);
        }

        let mut settings = get_settings(conn)?;
        if settings.fill_defaults() {
            save_settings(conn, &settings)?;
        }
        let mut ledger = EncryptionLedger::from_settings(&settings)?;
        let sealer = match &params.encryption {
            Some(target) => {
                FixtureSealer::new(&ledger).with_encryption(&target.engine, &target.tables)
            }
            None => FixtureSealer::new(&ledger),
        };
        report.fixtures_installed = install_fixtures(
            conn,
            params.clock,
            params.server_credentials.as_ref(),
            &sealer,
        )?;

        if let Some(target) = &params.encryption {
            let pass = target.engine.encrypt(conn, &mut ledger, &target.tables)?;
            if !pass.is_noop() {
                persist_ledger(conn, &ledger)?;
            }
            report.encryption = Some(pass);
        }
        Ok(report)
    })
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;

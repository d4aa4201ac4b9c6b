//! Status command implementation

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::load_project;
use cv_store::MigrationRegistry;

/// Snapshot printed by `cv status`.
#[derive(Debug, Serialize)]
struct StatusReport {
    name: String,
    database: String,
    current_version: i64,
    latest_version: i64,
    pending_versions: i64,
    encrypted_columns: Vec<String>,
    key_path: String,
    key_fingerprint: Option<String>,
    /// Backup left by a rotation that did not finish.
    key_backup: Option<String>,
}

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let store = project.open_store()?;
    let registry = MigrationRegistry::bundled();

    let current_version = store
        .current_version()
        .context("Failed to read schema version")?;
    let latest_version = registry.latest_version();

    // The settings table only exists once version 1 is applied.
    let encrypted_columns = if current_version > 0 {
        store
            .encryption_ledger()
            .context("Failed to read encryption ledger")?
            .iter()
            .map(ToString::to_string)
            .collect()
    } else {
        Vec::new()
    };

    let keys = project.key_store();
    let key_fingerprint = if keys.exists() {
        Some(project.load_key()?.fingerprint())
    } else {
        None
    };

    let report = StatusReport {
        name: project.config.name.clone(),
        database: project.database_path().display().to_string(),
        current_version,
        latest_version,
        pending_versions: (latest_version - current_version).max(0),
        encrypted_columns,
        key_path: keys.path().display().to_string(),
        key_fingerprint,
        key_backup: keys
            .has_backup()
            .then(|| keys.backup_path().display().to_string()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Installation: {}", report.name);
    println!("Database:     {}", report.database);
    println!(
        "Schema:       version {} of {} ({} pending)",
        report.current_version, report.latest_version, report.pending_versions
    );
    match &report.key_fingerprint {
        Some(fp) => println!("Key:          {} ({fp})", report.key_path),
        None => println!("Key:          {} (missing)", report.key_path),
    }
    if let Some(backup) = &report.key_backup {
        println!("Key backup:   {backup} (left by an interrupted rotation; restore it if values fail to decrypt)");
    }
    if report.encrypted_columns.is_empty() {
        println!("Encrypted:    none");
    } else {
        println!("Encrypted:    {} column(s)", report.encrypted_columns.len());
        for column in &report.encrypted_columns {
            println!("  {column}");
        }
    }
    Ok(())
}

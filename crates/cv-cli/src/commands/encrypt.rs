//! Encrypt and decrypt command implementations

use anyhow::{Context, Result};
use cv_crypto::Encryptor;
use cv_store::{Direction, PassReport};

use crate::cli::GlobalArgs;
use crate::commands::common::{load_project, Project};

/// Execute the encrypt command
pub async fn execute_encrypt(global: &GlobalArgs) -> Result<()> {
    run(global, Direction::Encrypt)
}

/// Execute the decrypt command
pub async fn execute_decrypt(global: &GlobalArgs) -> Result<()> {
    run(global, Direction::Decrypt)
}

fn run(global: &GlobalArgs, direction: Direction) -> Result<()> {
    let project = load_project(global)?;
    let store = project.open_store()?;
    let key = project.load_key()?;
    let cipher = Encryptor::new(&key);
    let engine = project.engine(&cipher);
    let tables = project.encryption_tables();

    let report = match direction {
        Direction::Encrypt => store.encrypt_columns(&engine, &tables),
        Direction::Decrypt => store.decrypt_columns(&engine, &tables),
    }
    .with_context(|| format!("Failed to {direction} columns"))?;

    print_report(&project, direction, &report);
    Ok(())
}

fn print_report(project: &Project, direction: Direction, report: &PassReport) {
    if report.is_noop() {
        println!(
            "Nothing to {direction}: all configured columns of {} are already converged",
            project.config.name
        );
        return;
    }
    let verb = match direction {
        Direction::Encrypt => "Encrypted",
        Direction::Decrypt => "Decrypted",
    };
    println!(
        "{verb} {} column(s) across {} table(s), {} row(s) updated",
        report.columns.len(),
        report.tables,
        report.rows_updated
    );
    for column in &report.columns {
        println!("  {column}");
    }
    if report.fields_failed > 0 {
        eprintln!(
            "Warning: {} field(s) failed to {direction} and were left unchanged",
            report.fields_failed
        );
    }
}

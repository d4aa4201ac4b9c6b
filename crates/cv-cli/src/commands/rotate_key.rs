//! Rotate-key command implementation

use anyhow::Result;
use cv_rotate::{RotationCoordinator, RotationOutcome, SupervisorctlController};
use std::time::Duration;

use crate::cli::GlobalArgs;
use crate::commands::common::{load_project, ExitCode};

/// Execute the rotate-key command
///
/// Returns `ExitCode(2|3|4)` for the failing stage.
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let store = project.open_store()?;
    let keys = project.key_store();
    let service = &project.config.service;
    let controller = SupervisorctlController::new(
        service.supervisorctl.as_str(),
        Duration::from_secs(service.stop_timeout_secs),
    );

    let outcome = RotationCoordinator::new(
        &store,
        &keys,
        &controller,
        service.name.as_str(),
        project.config.database.name.as_str(),
    )
    .tables(project.encryption_tables())
    .failure_policy(project.config.encryption.failure_policy)
    .batch_size(project.config.encryption.batch_size)
    .rotate()
    .await;

    match &outcome {
        RotationOutcome::Success(summary) => {
            println!(
                "Rotated encryption key {} -> {}: {} column(s), {} row(s) re-encrypted",
                summary.old_fingerprint, summary.new_fingerprint, summary.columns, summary.rows
            );
        }
        RotationOutcome::StopFailed(error) => {
            eprintln!("Key rotation aborted while stopping '{}': {error}", service.name);
            eprintln!("No data or keys were changed.");
        }
        RotationOutcome::RotationFailed { stage, error } => {
            eprintln!("Key rotation failed while {stage}: {error}");
            eprintln!(
                "The previous key is still active. Service '{}' was left stopped.",
                service.name
            );
        }
        RotationOutcome::StartFailed { summary, error } => {
            eprintln!(
                "Key rotated to {} but service '{}' failed to start: {error}",
                summary.new_fingerprint, service.name
            );
        }
    }

    match outcome.exit_code() {
        0 => Ok(()),
        code => Err(ExitCode(code).into()),
    }
}

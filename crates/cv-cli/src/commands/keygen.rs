//! Keygen command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, KeygenArgs};
use crate::commands::common::load_project;

/// Execute the keygen command
pub async fn execute(args: &KeygenArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let keys = project.key_store();

    if args.force && keys.exists() {
        eprintln!(
            "Warning: overwriting {}; values encrypted under the old key will be unreadable",
            keys.path().display()
        );
    }
    let key = keys
        .create(args.force)
        .with_context(|| format!("Failed to create key {}", keys.path().display()))?;

    println!(
        "Created encryption key {} ({})",
        keys.path().display(),
        key.fingerprint()
    );
    Ok(())
}

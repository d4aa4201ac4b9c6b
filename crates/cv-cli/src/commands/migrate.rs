//! Migrate command implementation

use anyhow::{Context, Result};
use cv_core::SystemClock;
use cv_crypto::Encryptor;
use cv_store::{setup_db, MigrationRegistry, ServerCredentials, SetupFixtures, SetupParams};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::load_project;

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let store = project.open_store()?;
    let registry = MigrationRegistry::bundled();
    let target = args
        .target_version
        .or(project.config.migration.target_version);

    let fixtures = if args.skip_fixtures {
        SetupFixtures::Skip
    } else {
        SetupFixtures::Setup
    };

    // The key is created on first setup so the encryption pass has one.
    let key = match fixtures {
        SetupFixtures::Setup => {
            let keys = project.key_store();
            let (key, created) = keys
                .load_or_create()
                .with_context(|| format!("Failed to prepare key {}", keys.path().display()))?;
            if created {
                println!(
                    "Created encryption key {} ({})",
                    keys.path().display(),
                    key.fingerprint()
                );
            }
            Some(key)
        }
        SetupFixtures::Skip => None,
    };
    let cipher = key.as_ref().map(Encryptor::new);

    let clock = SystemClock;
    let mut params = SetupParams::new(&clock)
        .target_version(target)
        .fixtures(fixtures);
    if let (Some(username), Some(password)) = (&args.server_username, &args.server_password) {
        params = params.server_credentials(ServerCredentials {
            username: username.clone(),
            password: password.clone(),
        });
    }
    if let Some(cipher) = &cipher {
        params = params.encryption(project.engine(cipher), project.encryption_tables());
    }

    let report = setup_db(&store, &registry, params).context("Migration failed")?;

    if report.applied.is_empty() {
        println!("Schema is up to date at version {}", report.to);
    } else {
        println!(
            "Migrated {} from version {} to {} ({} version(s) applied)",
            project.config.name,
            report.from,
            report.to,
            report.applied.len()
        );
    }
    if report.fixtures_installed {
        println!("Installed default fixtures");
    }
    if let Some(pass) = &report.encryption {
        if !pass.is_noop() {
            println!(
                "Encrypted {} column(s), {} row(s) updated",
                pass.columns.len(),
                pass.rows_updated
            );
        }
        if pass.fields_failed > 0 {
            eprintln!(
                "Warning: {} field(s) could not be encrypted and were left unchanged",
                pass.fields_failed
            );
        }
    }
    Ok(())
}

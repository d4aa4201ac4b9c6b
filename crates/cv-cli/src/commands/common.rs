//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use cv_core::config::Config;
use cv_crypto::{FileKeyStore, KeyMaterial};
use cv_store::{resolve_encryption_columns, EncryptionEngine, Store, TableEncryptionSpec};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; never shown to the user.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Loaded configuration plus the directory relative paths resolve against.
pub(crate) struct Project {
    pub(crate) config: Config,
    pub(crate) root: PathBuf,
}

impl Project {
    pub(crate) fn database_path(&self) -> PathBuf {
        self.config.database_path_absolute(&self.root)
    }

    pub(crate) fn key_store(&self) -> FileKeyStore {
        FileKeyStore::new(self.config.key_path_absolute(&self.root))
    }

    pub(crate) fn encryption_tables(&self) -> Vec<TableEncryptionSpec> {
        resolve_encryption_columns(&self.config.encryption)
    }

    /// Engine configured from the `encryption` section.
    pub(crate) fn engine<'c>(&self, cipher: &'c dyn cv_crypto::Cipher) -> EncryptionEngine<'c> {
        EncryptionEngine::new(cipher, self.config.database.name.as_str())
            .failure_policy(self.config.encryption.failure_policy)
            .batch_size(self.config.encryption.batch_size)
    }

    pub(crate) fn open_store(&self) -> Result<Store> {
        let path = self.database_path();
        Store::open(&path).with_context(|| format!("Failed to open database {}", path.display()))
    }

    /// Load the active key; it must already exist.
    pub(crate) fn load_key(&self) -> Result<KeyMaterial> {
        let keys = self.key_store();
        keys.load().with_context(|| {
            format!(
                "Failed to load encryption key from {} (run `cv keygen` or `cv migrate` first)",
                keys.path().display()
            )
        })
    }
}

/// Load colvault.yml from `--config` or the project directory.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .context("Failed to load configuration")?;
    Ok(Project { config, root })
}

//! Key rotation coordinator.
//!
//! Stages: stop the service, decrypt every protected column with the old
//! key, install a fresh key, re-encrypt with it, start the service.
//!
//! Decrypt, key install and re-encrypt share one database transaction. If
//! anything inside it fails the transaction rolls back, leaving the rows
//! encrypted under the old key, and the old key file is restored. Disk and
//! key file therefore always agree.
//!
//! The column set must cover every ledger entry. An entry it misses would
//! stay sealed under a key that is about to be discarded, so the rotation
//! fails at the decrypt stage before the key file is touched.

use crate::controller::ServiceController;
use crate::error::RotateError;
use cv_core::FailurePolicy;
use cv_crypto::{Encryptor, FileKeyStore, KeyMaterial};
use cv_store::encryption::DEFAULT_BATCH_SIZE;
use cv_store::ledger::{load_ledger, persist_ledger};
use cv_store::{default_encryption_columns, EncryptionEngine, Store, TableEncryptionSpec};
use std::fmt;

/// Exit code for a completed rotation.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when the service could not be stopped; nothing was touched.
pub const EXIT_STOP_FAILED: i32 = 2;
/// Exit code when decrypt, key install or re-encrypt failed.
pub const EXIT_ROTATION_FAILED: i32 = 3;
/// Exit code when the service did not come back; the rotation is committed.
pub const EXIT_START_FAILED: i32 = 4;

/// Rotation stage, used to report where a rotation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    Stopping,
    Decrypting,
    Rotating,
    Encrypting,
    Starting,
}

impl fmt::Display for RotationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RotationStage::Stopping => "stopping service",
            RotationStage::Decrypting => "decrypting",
            RotationStage::Rotating => "installing new key",
            RotationStage::Encrypting => "re-encrypting",
            RotationStage::Starting => "starting service",
        };
        f.write_str(name)
    }
}

/// What a committed rotation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSummary {
    pub old_fingerprint: String,
    pub new_fingerprint: String,
    /// Columns encrypted under the new key.
    pub columns: usize,
    /// Rows rewritten by the re-encrypt pass.
    pub rows: usize,
}

/// Result of [`RotationCoordinator::rotate`].
#[derive(Debug)]
pub enum RotationOutcome {
    Success(RotationSummary),
    StopFailed(RotateError),
    /// Rolled back; the old key is active and the service is still stopped.
    RotationFailed {
        stage: RotationStage,
        error: RotateError,
    },
    /// The rotation is committed but the service did not start.
    StartFailed {
        summary: RotationSummary,
        error: RotateError,
    },
}

impl RotationOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RotationOutcome::Success(_) => EXIT_SUCCESS,
            RotationOutcome::StopFailed(_) => EXIT_STOP_FAILED,
            RotationOutcome::RotationFailed { .. } => EXIT_ROTATION_FAILED,
            RotationOutcome::StartFailed { .. } => EXIT_START_FAILED,
        }
    }

    /// Stage that failed, if any.
    pub fn failed_stage(&self) -> Option<RotationStage> {
        match self {
            RotationOutcome::Success(_) => None,
            RotationOutcome::StopFailed(_) => Some(RotationStage::Stopping),
            RotationOutcome::RotationFailed { stage, .. } => Some(*stage),
            RotationOutcome::StartFailed { .. } => Some(RotationStage::Starting),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RotationOutcome::Success(_))
    }
}

/// Drives one key rotation.
pub struct RotationCoordinator<'a> {
    store: &'a Store,
    keys: &'a FileKeyStore,
    controller: &'a dyn ServiceController,
    service: String,
    database: String,
    tables: Vec<TableEncryptionSpec>,
    policy: FailurePolicy,
    batch_size: usize,
}

impl<'a> RotationCoordinator<'a> {
    pub fn new(
        store: &'a Store,
        keys: &'a FileKeyStore,
        controller: &'a dyn ServiceController,
        service: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            store,
            keys,
            controller,
            service: service.into(),
            database: database.into(),
            tables: default_encryption_columns(),
            policy: FailurePolicy::FailFast,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Column set to rotate; defaults to [`default_encryption_columns`].
    pub fn tables(mut self, tables: Vec<TableEncryptionSpec>) -> Self {
        self.tables = tables;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Run every stage. Never panics on stage failure; inspect the outcome.
    pub async fn rotate(&self) -> RotationOutcome {
        log::info!("Stopping service '{}'", self.service);
        if let Err(error) = self.controller.stop(&self.service).await {
            log::error!("Key rotation aborted: {error}");
            return RotationOutcome::StopFailed(error);
        }

        let summary = match self.rekey() {
            Ok(summary) => summary,
            Err((stage, error)) => {
                log::error!("Key rotation failed while {stage}: {error}");
                return RotationOutcome::RotationFailed { stage, error };
            }
        };
        log::info!(
            "Rotated key {} -> {} ({} column(s), {} row(s))",
            summary.old_fingerprint,
            summary.new_fingerprint,
            summary.columns,
            summary.rows
        );

        log::info!("Starting service '{}'", self.service);
        if let Err(error) = self.controller.start(&self.service).await {
            log::error!("Key rotated but service failed to start: {error}");
            return RotationOutcome::StartFailed { summary, error };
        }
        RotationOutcome::Success(summary)
    }

    fn rekey(&self) -> Result<RotationSummary, (RotationStage, RotateError)> {
        let old_key = self
            .keys
            .load()
            .map_err(|e| (RotationStage::Decrypting, RotateError::from(e)))?;
        let new_key = KeyMaterial::generate();
        let old_cipher = Encryptor::new(&old_key);
        let new_cipher = Encryptor::new(&new_key);

        let mut stage = RotationStage::Decrypting;
        let mut key_installed = false;

        let result = self.store.transaction(|conn| {
            let mut ledger = load_ledger(conn)?;
            self.engine(&old_cipher)
                .decrypt_all(conn, &mut ledger, &self.tables)?;

            stage = RotationStage::Rotating;
            key_installed = true;
            self.keys.install(&new_key)?;

            stage = RotationStage::Encrypting;
            let pass = self
                .engine(&new_cipher)
                .encrypt(conn, &mut ledger, &self.tables)?;
            persist_ledger(conn, &ledger)?;
            Ok((ledger.len(), pass.rows_updated))
        });

        match result {
            Ok((columns, rows)) => {
                if let Err(e) = self.keys.discard_backup() {
                    log::warn!("Could not remove previous key backup: {e}");
                }
                Ok(RotationSummary {
                    old_fingerprint: old_key.fingerprint(),
                    new_fingerprint: new_key.fingerprint(),
                    columns,
                    rows,
                })
            }
            Err(error) => {
                if key_installed {
                    if let Err(e) = self.keys.restore(&old_key) {
                        log::error!(
                            "Failed to restore previous key; it is kept at {}: {e}",
                            self.keys.backup_path().display()
                        );
                    }
                }
                Err((stage, RotateError::from(error)))
            }
        }
    }

    fn engine<'c>(&self, cipher: &'c Encryptor) -> EncryptionEngine<'c> {
        EncryptionEngine::new(cipher, self.database.as_str())
            .failure_policy(self.policy)
            .batch_size(self.batch_size)
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;

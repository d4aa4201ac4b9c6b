//! Error types for cv-rotate

use crate::controller::ServiceState;
use cv_crypto::CryptoError;
use cv_store::StoreError;
use thiserror::Error;

/// Rotation and service control errors
#[derive(Error, Debug)]
pub enum RotateError {
    /// R001: Supervisor refused or failed the requested action
    #[error("[R001] Service '{service}' failed to {action}: {message}")]
    ServiceCommand {
        service: String,
        action: &'static str,
        message: String,
    },

    /// R002: Service did not reach the expected state in time
    #[error("[R002] Timed out after {secs}s waiting for service '{service}' to be {state}")]
    Timeout {
        service: String,
        state: ServiceState,
        secs: u64,
    },

    /// R003: Supervisor executable could not be run
    #[error("[R003] Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// R004: Database error during a rotation stage
    #[error("[R004] {0}")]
    Store(#[from] StoreError),

    /// R005: Key error during a rotation stage
    #[error("[R005] {0}")]
    Crypto(#[from] CryptoError),
}

/// Result type alias for RotateError
pub type RotateResult<T> = Result<T, RotateError>;

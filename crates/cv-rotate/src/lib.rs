//! cv-rotate - Key rotation for Colvault
//!
//! Stops the service that owns the database, re-keys every protected column
//! in one transaction, and starts the service again. Each failure stage maps
//! to a distinct process exit code.

pub mod controller;
pub mod coordinator;
pub mod error;

pub use controller::{ServiceController, ServiceState, SupervisorctlController};
pub use coordinator::{
    RotationCoordinator, RotationOutcome, RotationStage, RotationSummary, EXIT_ROTATION_FAILED,
    EXIT_START_FAILED, EXIT_STOP_FAILED, EXIT_SUCCESS,
};
pub use error::{RotateError, RotateResult};

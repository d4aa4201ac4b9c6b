//! cv-core - Core library for Colvault
//!
//! Shared configuration parsing, the `db.table.column` identifier used by the
//! encryption ledger, SQL identifier helpers, and the injected clock.

pub mod clock;
pub mod column_path;
pub mod config;
pub mod error;
pub mod sql_utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use column_path::ColumnPath;
pub use config::{Config, FailurePolicy};
pub use error::{CoreError, CoreResult};

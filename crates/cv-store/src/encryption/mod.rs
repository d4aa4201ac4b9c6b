//! Field-level column encryption.

pub mod columns;
pub mod engine;
pub mod transform;

pub use columns::{
    default_encryption_columns, resolve_encryption_columns, ColumnSpec, TableEncryptionSpec,
};
pub use engine::{EncryptionEngine, PassReport, DEFAULT_BATCH_SIZE};
pub use transform::{ColumnTransform, CustomTransform, Direction, TransformError};

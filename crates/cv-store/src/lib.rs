//! cv-store - DuckDB store for Colvault
//!
//! Owns the schema (migration registry, version tracker and runner), the
//! settings blob with its encryption ledger, and the engine that rewrites
//! protected columns in place.

pub mod connection;
pub mod ddl;
pub mod encryption;
pub mod error;
pub mod fixtures;
pub mod ledger;
pub mod migration;
pub mod settings;

pub use connection::Store;
pub use ddl::{MigrationBatch, MigrationRegistry};
pub use encryption::{
    default_encryption_columns, resolve_encryption_columns, ColumnSpec, ColumnTransform,
    Direction, EncryptionEngine, PassReport, TableEncryptionSpec,
};
pub use error::{StoreError, StoreResult};
pub use fixtures::{FixtureSealer, ServerCredentials};
pub use ledger::EncryptionLedger;
pub use migration::{setup_db, MigrationReport, SetupFixtures, SetupParams};
pub use settings::Settings;

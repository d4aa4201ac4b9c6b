//! Tests for the version tracker, migration runner, and setup entry point.

use super::*;
use crate::ddl::MigrationBatch;
use crate::encryption::default_encryption_columns;
use crate::fixtures::{SERVER_DB_EXPORTER_ID, SERVER_NODE_ID};
use chrono::{TimeZone, Utc};
use cv_core::{FixedClock, SystemClock};
use cv_crypto::{Cipher, Encryptor, KeyMaterial};

// ── Helpers ────────────────────────────────────────────────────────────

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
}

fn count(store: &Store, sql: &str) -> i64 {
    store
        .conn()
        .query_row(sql, [], |row| row.get::<_, i64>(0))
        .unwrap()
}

fn table_exists(store: &Store, table: &str) -> bool {
    count(
        store,
        &format!("SELECT COUNT(*) FROM information_schema.tables WHERE table_name = '{table}'"),
    ) > 0
}

fn versions(store: &Store) -> Vec<i64> {
    let mut stmt = store
        .conn()
        .prepare("SELECT id FROM schema_migrations ORDER BY id")
        .unwrap();
    stmt.query_map([], |row| row.get::<_, i64>(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

/// Three-version registry used by the runner tests.
fn small_registry() -> MigrationRegistry {
    MigrationRegistry::new(vec![
        MigrationBatch::new(
            1,
            [
                "CREATE TABLE schema_migrations (id BIGINT NOT NULL)",
                "CREATE TABLE settings (settings VARCHAR NOT NULL)",
                "INSERT INTO settings (settings) VALUES ('{}')",
                "CREATE TABLE creds (id VARCHAR NOT NULL, access_key VARCHAR)",
            ],
        ),
        MigrationBatch::new(2, ["ALTER TABLE creds ADD COLUMN note VARCHAR"]),
        MigrationBatch::new(3, ["CREATE TABLE audit (id INTEGER)"]),
    ])
    .unwrap()
}

fn migrate_only(target: Option<i64>) -> SetupParams<'static> {
    static CLOCK: SystemClock = SystemClock;
    SetupParams::new(&CLOCK)
        .target_version(target)
        .fixtures(SetupFixtures::Skip)
}

// ── Version tracker ────────────────────────────────────────────────────

#[test]
fn current_version_without_ledger_table_is_zero() {
    let store = Store::open_memory().unwrap();
    assert_eq!(current_version(store.conn()).unwrap(), 0);
}

#[test]
fn current_version_with_empty_ledger_is_zero() {
    let store = Store::open_memory().unwrap();
    store
        .conn()
        .execute_batch("CREATE TABLE schema_migrations (id BIGINT NOT NULL)")
        .unwrap();
    assert_eq!(current_version(store.conn()).unwrap(), 0);
}

// ── Runner ─────────────────────────────────────────────────────────────

#[test]
fn three_versions_from_scratch() {
    let store = Store::open_memory().unwrap();
    let report = setup_db(&store, &small_registry(), migrate_only(None)).unwrap();

    assert_eq!(report.from, 0);
    assert_eq!(report.to, 3);
    assert_eq!(report.applied, vec![1, 2, 3]);
    assert_eq!(versions(&store), vec![1, 2, 3]);
    assert_eq!(store.current_version().unwrap(), 3);
}

#[test]
fn incremental_application_matches_direct() {
    let direct = Store::open_memory().unwrap();
    setup_db(&direct, &small_registry(), migrate_only(Some(3))).unwrap();

    let stepped = Store::open_memory().unwrap();
    let first = setup_db(&stepped, &small_registry(), migrate_only(Some(1))).unwrap();
    assert_eq!(first.applied, vec![1]);
    let second = setup_db(&stepped, &small_registry(), migrate_only(Some(3))).unwrap();
    assert_eq!(second.from, 1);
    assert_eq!(second.applied, vec![2, 3]);

    assert_eq!(versions(&direct), versions(&stepped));
    for table in ["creds", "audit", "settings"] {
        assert_eq!(table_exists(&direct, table), table_exists(&stepped, table));
    }
    assert_eq!(
        count(&stepped, "SELECT COUNT(*) FROM information_schema.columns WHERE table_name = 'creds'"),
        3
    );
}

#[test]
fn rerun_at_target_is_noop() {
    let store = Store::open_memory().unwrap();
    setup_db(&store, &small_registry(), migrate_only(None)).unwrap();
    let report = setup_db(&store, &small_registry(), migrate_only(None)).unwrap();

    assert_eq!(report.from, 3);
    assert_eq!(report.to, 3);
    assert!(report.applied.is_empty());
    assert_eq!(versions(&store), vec![1, 2, 3]);
}

#[test]
fn failing_statement_rolls_back_whole_run() {
    let registry = MigrationRegistry::new(vec![
        small_registry().batches()[0].clone(),
        MigrationBatch::new(
            2,
            [
                "CREATE TABLE half_done (id INTEGER)",
                "ALTER TABLE no_such_table ADD COLUMN x INTEGER",
            ],
        ),
    ])
    .unwrap();
    let store = Store::open_memory().unwrap();

    let err = setup_db(&store, &registry, migrate_only(None)).unwrap_err();
    match err {
        StoreError::Migration {
            version, statement, ..
        } => {
            assert_eq!(version, 2);
            assert!(statement.contains("no_such_table"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.current_version().unwrap(), 0);
    assert!(!table_exists(&store, "half_done"));
    assert!(!table_exists(&store, "creds"));
}

#[test]
fn failing_later_version_keeps_prior_max() {
    let store = Store::open_memory().unwrap();
    setup_db(&store, &small_registry(), migrate_only(Some(2))).unwrap();

    let mut batches = small_registry().batches().to_vec();
    batches[2] = MigrationBatch::new(3, ["CREATE TABLE audit (id INTEGER)", "SELEC broken"]);
    let broken = MigrationRegistry::new(batches).unwrap();

    assert!(setup_db(&store, &broken, migrate_only(None)).is_err());
    assert_eq!(store.current_version().unwrap(), 2);
    assert!(!table_exists(&store, "audit"));
}

#[test]
fn target_beyond_latest_is_rejected() {
    let store = Store::open_memory().unwrap();
    let err = setup_db(&store, &small_registry(), migrate_only(Some(4))).unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidTarget {
            target: 4,
            latest: 3
        }
    ));
    assert_eq!(store.current_version().unwrap(), 0);
}

#[test]
fn target_below_current_never_runs_backwards() {
    let store = Store::open_memory().unwrap();
    setup_db(&store, &small_registry(), migrate_only(None)).unwrap();
    let report = setup_db(&store, &small_registry(), migrate_only(Some(1))).unwrap();
    assert_eq!(report.from, 3);
    assert_eq!(report.to, 3);
    assert!(report.applied.is_empty());
    assert!(table_exists(&store, "audit"));
}

// ── Bundled schema and setup ───────────────────────────────────────────

#[test]
fn bundled_schema_applies_cleanly() {
    let store = Store::open_memory().unwrap();
    let registry = MigrationRegistry::bundled();
    let report = setup_db(&store, &registry, migrate_only(None)).unwrap();
    assert_eq!(report.applied, (1..=registry.latest_version()).collect::<Vec<_>>());
    assert!(table_exists(&store, "sso_details"));
    assert!(!table_exists(&store, "action_results"));
}

#[test]
fn setup_installs_fixtures_and_encrypts() {
    let store = Store::open_memory().unwrap();
    let clock = clock();
    let cipher = Encryptor::new(&KeyMaterial::generate());
    let params = SetupParams::new(&clock)
        .server_credentials(ServerCredentials {
            username: "cv".to_string(),
            password: "s3cret".to_string(),
        })
        .encryption(
            EncryptionEngine::new(&cipher, "colvault"),
            default_encryption_columns(),
        );

    let report = setup_db(&store, &MigrationRegistry::bundled(), params).unwrap();
    assert!(report.fixtures_installed);
    let pass = report.encryption.unwrap();
    assert_eq!(pass.tables, 2);

    let settings = get_settings(store.conn()).unwrap();
    assert_eq!(settings.data_retention_days, Some(30));
    assert!(settings.server_id.is_some());
    assert!(settings
        .encrypted_items
        .contains(&"colvault.agents.password".to_string()));
    assert!(settings
        .encrypted_items
        .contains(&"colvault.sso_details.client_secret".to_string()));

    let password: String = store
        .conn()
        .query_row(
            "SELECT password FROM agents WHERE agent_id = ?",
            duckdb::params![SERVER_DB_EXPORTER_ID],
            |row| row.get(0),
        )
        .unwrap();
    assert_ne!(password, "s3cret");
    assert_eq!(cipher.decrypt(&password).unwrap(), "s3cret");

    let created: String = store
        .conn()
        .query_row(
            "SELECT CAST(created_at AS VARCHAR) FROM nodes WHERE node_id = ?",
            duckdb::params![SERVER_NODE_ID],
            |row| row.get(0),
        )
        .unwrap();
    assert!(created.starts_with("2024-03-01 12:00:00"));
}

#[test]
fn second_setup_writes_nothing() {
    let store = Store::open_memory().unwrap();
    let clock = clock();
    let cipher = Encryptor::new(&KeyMaterial::generate());
    let params = || {
        SetupParams::new(&clock).encryption(
            EncryptionEngine::new(&cipher, "colvault"),
            default_encryption_columns(),
        )
    };

    setup_db(&store, &MigrationRegistry::bundled(), params()).unwrap();
    let settings_before = get_settings(store.conn()).unwrap();

    let report = setup_db(&store, &MigrationRegistry::bundled(), params()).unwrap();
    assert!(report.applied.is_empty());
    assert!(!report.fixtures_installed);
    let pass = report.encryption.unwrap();
    assert!(pass.is_noop());
    assert_eq!(pass.rows_updated, 0);
    assert_eq!(get_settings(store.conn()).unwrap(), settings_before);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM nodes"), 1);
}

#[test]
fn setup_skipped_below_latest() {
    let store = Store::open_memory().unwrap();
    let clock = clock();
    let params = SetupParams::new(&clock).target_version(Some(3));
    let report = setup_db(&store, &MigrationRegistry::bundled(), params).unwrap();
    assert_eq!(report.to, 3);
    assert!(!report.fixtures_installed);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM nodes"), 0);
}

#[test]
fn credentials_added_after_first_setup_are_stored_encrypted() {
    let store = Store::open_memory().unwrap();
    let clock = clock();
    let cipher = Encryptor::new(&KeyMaterial::generate());
    let engine = || EncryptionEngine::new(&cipher, "colvault");

    setup_db(
        &store,
        &MigrationRegistry::bundled(),
        SetupParams::new(&clock).encryption(engine(), default_encryption_columns()),
    )
    .unwrap();
    assert!(store
        .encryption_ledger()
        .unwrap()
        .contains(&"colvault.agents.password".parse().unwrap()));

    let params = SetupParams::new(&clock)
        .server_credentials(ServerCredentials {
            username: "cv".to_string(),
            password: "hunter2".to_string(),
        })
        .encryption(engine(), default_encryption_columns());
    let report = setup_db(&store, &MigrationRegistry::bundled(), params).unwrap();
    assert!(report.fixtures_installed);
    assert!(report.encryption.unwrap().is_noop());

    let (username, password): (String, String) = store
        .conn()
        .query_row(
            "SELECT username, password FROM agents WHERE agent_id = ?",
            duckdb::params![SERVER_DB_EXPORTER_ID],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_ne!(password, "hunter2");
    assert_eq!(cipher.decrypt(&password).unwrap(), "hunter2");
    assert_eq!(cipher.decrypt(&username).unwrap(), "cv");

    // Every ledgered column is readable: a full decrypt succeeds.
    store
        .decrypt_columns(&engine(), &default_encryption_columns())
        .unwrap();
    assert!(store.encryption_ledger().unwrap().is_empty());
}

#[test]
fn ledgered_fixture_column_without_key_is_rejected() {
    let store = Store::open_memory().unwrap();
    let clock = clock();
    let cipher = Encryptor::new(&KeyMaterial::generate());
    setup_db(
        &store,
        &MigrationRegistry::bundled(),
        SetupParams::new(&clock).encryption(
            EncryptionEngine::new(&cipher, "colvault"),
            default_encryption_columns(),
        ),
    )
    .unwrap();

    let params = SetupParams::new(&clock).server_credentials(ServerCredentials {
        username: "cv".to_string(),
        password: "hunter2".to_string(),
    });
    let err = setup_db(&store, &MigrationRegistry::bundled(), params).unwrap_err();
    assert!(matches!(err, StoreError::KeyRequired(_)));
    assert_eq!(
        count(&store, "SELECT COUNT(*) FROM agents WHERE password = 'hunter2'"),
        0
    );
}

use super::*;

fn store_in(dir: &tempfile::TempDir) -> FileKeyStore {
    FileKeyStore::new(dir.path().join("keys").join("colvault.key"))
}

#[test]
fn load_missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(matches!(store.load(), Err(CryptoError::KeyNotFound { .. })));
}

#[test]
fn load_or_create_creates_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let (first, created) = store.load_or_create().unwrap();
    assert!(created);
    assert!(store.exists());

    let (second, created_again) = store.load_or_create().unwrap();
    assert!(!created_again);
    assert_eq!(first, second);
}

#[test]
fn create_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let original = store.create(false).unwrap();

    assert!(matches!(
        store.create(false),
        Err(CryptoError::KeyExists { .. })
    ));
    assert_eq!(store.load().unwrap(), original);

    let replaced = store.create(true).unwrap();
    assert_ne!(replaced, original);
    assert_eq!(store.load().unwrap(), replaced);
}

#[test]
fn install_backs_up_previous_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let old = store.create(false).unwrap();
    let new = KeyMaterial::generate();

    store.install(&new).unwrap();

    assert_eq!(store.load().unwrap(), new);
    assert_eq!(store.load_backup().unwrap(), Some(old));
}

#[test]
fn leftover_backup_is_detected_and_active_key_still_loads() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.create(false).unwrap();
    assert!(!store.has_backup());

    let new = KeyMaterial::generate();
    store.install(&new).unwrap();
    assert!(store.has_backup());
    assert_eq!(store.load().unwrap(), new);

    store.discard_backup().unwrap();
    assert!(!store.has_backup());
}

#[test]
fn restore_reinstates_old_key_and_drops_backup() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let old = store.create(false).unwrap();
    store.install(&KeyMaterial::generate()).unwrap();

    store.restore(&old).unwrap();

    assert_eq!(store.load().unwrap(), old);
    assert!(store.load_backup().unwrap().is_none());
    assert!(!store.backup_path().exists());
}

#[test]
fn discard_backup_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.discard_backup().unwrap();
    store.create(false).unwrap();
    store.install(&KeyMaterial::generate()).unwrap();
    store.discard_backup().unwrap();
    store.discard_backup().unwrap();
    assert!(!store.backup_path().exists());
}

#[test]
fn corrupt_key_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "c2hvcnQ=").unwrap();
    assert!(matches!(store.load(), Err(CryptoError::InvalidKey(_))));
}

#[cfg(unix)]
#[test]
fn key_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.create(false).unwrap();
    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

//! File-backed key storage.
//!
//! The active key lives in a single base64 file. Rotation writes the
//! outgoing key to `<path>.previous` before installing a new one, so a crash
//! between installing the key and committing the re-encrypted rows leaves
//! the old key recoverable on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyMaterial;

/// Key file at a fixed path.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Store rooted at `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the active key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the rotation backup.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".previous");
        PathBuf::from(name)
    }

    /// Whether the active key file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Whether a rotation backup is on disk.
    ///
    /// Outside a rotation this means a rotation was interrupted after the new
    /// key was installed; the stored values may still be sealed under the key
    /// in the backup.
    pub fn has_backup(&self) -> bool {
        self.backup_path().exists()
    }

    /// Read the active key. Warns when a rotation backup is left over.
    pub fn load(&self) -> CryptoResult<KeyMaterial> {
        if self.has_backup() {
            log::warn!(
                "Found key backup {} from an interrupted rotation; if values fail to decrypt, restore it over {}",
                self.backup_path().display(),
                self.path.display()
            );
        }
        read_key(&self.path)
    }

    /// Read the rotation backup, if one is present.
    pub fn load_backup(&self) -> CryptoResult<Option<KeyMaterial>> {
        let backup = self.backup_path();
        if !backup.exists() {
            return Ok(None);
        }
        read_key(&backup).map(Some)
    }

    /// Read the active key, generating and persisting one on first use.
    ///
    /// Returns the key and whether it was created by this call.
    pub fn load_or_create(&self) -> CryptoResult<(KeyMaterial, bool)> {
        if self.exists() {
            return Ok((self.load()?, false));
        }
        let key = KeyMaterial::generate();
        write_atomic(&self.path, &key)?;
        log::info!(
            "Generated new encryption key {} at {}",
            key.fingerprint(),
            self.path.display()
        );
        Ok((key, true))
    }

    /// Generate and persist a new key. Refuses to overwrite unless `force`.
    pub fn create(&self, force: bool) -> CryptoResult<KeyMaterial> {
        if self.exists() && !force {
            return Err(CryptoError::KeyExists {
                path: self.path.display().to_string(),
            });
        }
        let key = KeyMaterial::generate();
        write_atomic(&self.path, &key)?;
        Ok(key)
    }

    /// Install `new` as the active key, backing up the current key first.
    pub fn install(&self, new: &KeyMaterial) -> CryptoResult<()> {
        if self.exists() {
            let current = self.load()?;
            write_atomic(&self.backup_path(), &current)?;
        }
        write_atomic(&self.path, new)?;
        log::info!("Installed encryption key {}", new.fingerprint());
        Ok(())
    }

    /// Put `old` back as the active key and drop the backup.
    pub fn restore(&self, old: &KeyMaterial) -> CryptoResult<()> {
        write_atomic(&self.path, old)?;
        self.discard_backup()?;
        log::warn!("Restored encryption key {}", old.fingerprint());
        Ok(())
    }

    /// Remove the rotation backup once the new key is committed.
    pub fn discard_backup(&self) -> CryptoResult<()> {
        let backup = self.backup_path();
        match fs::remove_file(&backup) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&backup, e)),
        }
    }
}

fn read_key(path: &Path) -> CryptoResult<KeyMaterial> {
    if !path.exists() {
        return Err(CryptoError::KeyNotFound {
            path: path.display().to_string(),
        });
    }
    let raw = zeroize::Zeroizing::new(fs::read_to_string(path).map_err(|e| io_err(path, e))?);
    KeyMaterial::from_base64(&raw)
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, key: &KeyMaterial) -> CryptoResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    fs::write(&tmp, key.to_base64().as_bytes()).map_err(|e| io_err(&tmp, e))?;
    restrict_permissions(&tmp)?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> CryptoResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> CryptoResult<()> {
    Ok(())
}

fn io_err(path: &Path, source: std::io::Error) -> CryptoError {
    CryptoError::KeyIo {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
#[path = "key_store_test.rs"]
mod tests;

//! Symmetric key material.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// The active at-rest encryption key.
///
/// Bytes are wiped on drop. `Debug` prints only the fingerprint.
#[derive(Clone)]
pub struct KeyMaterial {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl KeyMaterial {
    /// Generate a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self { bytes }
    }

    /// Build from raw bytes; `bytes` must be exactly [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "wrong length: {} (expected {})",
                bytes.len(),
                KEY_LEN
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Decode the base64 form stored in key files.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let raw = Zeroizing::new(B64.decode(encoded.trim())?);
        Self::from_bytes(&raw)
    }

    /// Encode for storage in a key file.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(B64.encode(&self.bytes[..]))
    }

    /// Short, non-secret identifier: first 8 bytes of SHA-256, hex encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes[..]);
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..] == other.bytes[..]
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

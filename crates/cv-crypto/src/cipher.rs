//! Field-level cipher.
//!
//! Every value is sealed with AES-256-GCM under a fresh random 96-bit nonce
//! and stored as standard base64 of `nonce || ciphertext`, so a single text
//! column holds everything needed to open it again.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;

use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyMaterial;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Reversible string transform used for protected columns.
pub trait Cipher: Send + Sync {
    /// Seal `plaintext` into its stored text form.
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String>;

    /// Open a value produced by [`Cipher::encrypt`] under the same key.
    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String>;
}

/// AES-256-GCM implementation of [`Cipher`].
pub struct Encryptor {
    cipher: Aes256Gcm,
    fingerprint: String,
}

impl Encryptor {
    /// Build an encryptor bound to `key`.
    pub fn new(key: &KeyMaterial) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self {
            cipher,
            fingerprint: key.fingerprint(),
        }
    }

    /// Fingerprint of the key this encryptor was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Cipher for Encryptor {
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(B64.encode(sealed))
    }

    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        let sealed = B64.decode(ciphertext)?;
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Decrypt(format!(
                "sealed value too short: {} bytes",
                sealed.len()
            )));
        }

        let (nonce_bytes, body) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map_err(|_| {
                CryptoError::Decrypt(format!(
                    "authentication failed with key {}",
                    self.fingerprint
                ))
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decrypt(format!("invalid UTF-8 in decrypted data: {e}")))
    }
}

#[cfg(test)]
#[path = "cipher_test.rs"]
mod tests;

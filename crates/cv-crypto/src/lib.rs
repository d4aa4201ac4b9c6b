//! cv-crypto - At-rest encryption primitives for Colvault
//!
//! Provides the [`Cipher`] seam used by the encryption engine, its
//! AES-256-GCM implementation, and file-backed key storage with the backup
//! slot used during key rotation.

pub mod cipher;
pub mod error;
pub mod key;
pub mod key_store;

pub use cipher::{Cipher, Encryptor};
pub use error::{CryptoError, CryptoResult};
pub use key::{KeyMaterial, KEY_LEN};
pub use key_store::FileKeyStore;

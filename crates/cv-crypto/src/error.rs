//! Error types for cv-crypto

use thiserror::Error;

/// Key management and cipher errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// K001: Encryption failed
    #[error("[K001] Encryption failed: {0}")]
    Encrypt(String),

    /// K002: Decryption or authentication failed
    #[error("[K002] Decryption failed: {0}")]
    Decrypt(String),

    /// K003: Key bytes have the wrong shape
    #[error("[K003] Invalid key material: {0}")]
    InvalidKey(String),

    /// K004: No key file at the expected location
    #[error("[K004] Key file not found: {path}")]
    KeyNotFound { path: String },

    /// K005: Refusing to overwrite an existing key
    #[error("[K005] Key file already exists: {path}")]
    KeyExists { path: String },

    /// K006: Filesystem error while reading or writing a key file
    #[error("[K006] Key file error for '{path}': {source}")]
    KeyIo {
        path: String,
        source: std::io::Error,
    },

    /// K007: Base64 decode error
    #[error("[K007] Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result type alias for CryptoError
pub type CryptoResult<T> = Result<T, CryptoError>;

//! Per-column value transforms.

use cv_crypto::{Cipher, CryptoError};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Which way a pass moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    /// Whether a column with the given ledger membership still needs this
    /// pass.
    pub fn is_pending(self, in_ledger: bool) -> bool {
        match self {
            Direction::Encrypt => !in_ledger,
            Direction::Decrypt => in_ledger,
        }
    }

    fn apply(self, cipher: &dyn Cipher, value: &str) -> Result<String, CryptoError> {
        match self {
            Direction::Encrypt => cipher.encrypt(value),
            Direction::Decrypt => cipher.decrypt(value),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encrypt => write!(f, "encrypt"),
            Direction::Decrypt => write!(f, "decrypt"),
        }
    }
}

/// Failure of a single field transform.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{0}")]
    Crypto(#[from] CryptoError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Signature of a column-specific transform.
pub type CustomTransform = fn(&dyn Cipher, Direction, &str) -> Result<String, TransformError>;

/// How a protected column's text is rewritten.
#[derive(Clone)]
pub enum ColumnTransform {
    /// The whole value is sealed.
    Plain,
    /// The value is a JSON object; only these top-level string fields are
    /// sealed.
    JsonFields(Vec<String>),
    /// Caller-supplied transform.
    Custom(CustomTransform),
}

impl fmt::Debug for ColumnTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnTransform::Plain => write!(f, "Plain"),
            ColumnTransform::JsonFields(fields) => {
                f.debug_tuple("JsonFields").field(fields).finish()
            }
            ColumnTransform::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl ColumnTransform {
    /// Transform one non-NULL value.
    pub fn apply(
        &self,
        cipher: &dyn Cipher,
        direction: Direction,
        value: &str,
    ) -> Result<String, TransformError> {
        match self {
            ColumnTransform::Plain => Ok(direction.apply(cipher, value)?),
            ColumnTransform::JsonFields(fields) => {
                transform_json_fields(cipher, direction, fields, value)
            }
            ColumnTransform::Custom(transform) => transform(cipher, direction, value),
        }
    }
}

fn transform_json_fields(
    cipher: &dyn Cipher,
    direction: Direction,
    fields: &[String],
    value: &str,
) -> Result<String, TransformError> {
    if value.trim().is_empty() {
        return Ok(value.to_string());
    }
    let mut doc: Value = serde_json::from_str(value)?;
    let object = match &mut doc {
        Value::Object(object) => object,
        Value::Null => return Ok(value.to_string()),
        other => {
            return Err(TransformError::Custom(format!(
                "expected a JSON object, found {}",
                json_kind(other)
            )))
        }
    };

    let mut changed = false;
    for field in fields {
        if let Some(Value::String(s)) = object.get_mut(field) {
            if s.is_empty() {
                continue;
            }
            let transformed = direction.apply(cipher, s.as_str())?;
            *s = transformed;
            changed = true;
        }
    }

    // Keys keep their input order (serde_json `preserve_order`), so a compact
    // document round-trips byte for byte.
    if changed {
        Ok(serde_json::to_string(&doc)?)
    } else {
        Ok(value.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

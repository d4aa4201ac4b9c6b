//! SQL identifier utilities
//!
//! Table and column names reach dynamic UPDATE/SELECT statements from
//! configuration, so they are validated as plain identifiers and quoted
//! before interpolation.

use crate::error::{CoreError, CoreResult};

/// Quote a SQL identifier.
///
/// Wraps the identifier in double quotes and escapes any embedded double quotes
/// by doubling them, following the SQL standard.
///
/// # Examples
/// ```
/// use cv_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("agents"), r#""agents""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Returns true when `ident` is `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_plain_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate that `ident` is a plain identifier, returning it unchanged.
pub fn require_plain_ident(ident: &str) -> CoreResult<&str> {
    if is_plain_ident(ident) {
        Ok(ident)
    } else {
        Err(CoreError::InvalidIdentifier {
            ident: ident.to_string(),
        })
    }
}

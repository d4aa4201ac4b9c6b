//! Global settings blob.
//!
//! The `settings` table holds exactly one row with a JSON document. Only the
//! fields this crate owns are typed; everything else round-trips through
//! [`Settings::extra`] untouched.

use crate::error::{StoreError, StoreResult};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

/// Default retention applied on first setup.
pub const DEFAULT_DATA_RETENTION_DAYS: u32 = 30;

/// Typed view of the settings JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Durable form of the encryption ledger (`db.table.column` entries).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted_items: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_retention_days: Option<u32>,

    /// Installation identifier, generated once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Settings {
    /// Fill unset defaults. Returns true when anything changed.
    pub fn fill_defaults(&mut self) -> bool {
        let mut changed = false;
        if self.data_retention_days.is_none() {
            self.data_retention_days = Some(DEFAULT_DATA_RETENTION_DAYS);
            changed = true;
        }
        if self.server_id.is_none() {
            self.server_id = Some(uuid::Uuid::new_v4().to_string());
            changed = true;
        }
        changed
    }
}

/// Read and parse the settings row.
pub fn get_settings(conn: &Connection) -> StoreResult<Settings> {
    let raw: String = conn
        .query_row("SELECT settings FROM settings LIMIT 1", [], |row| row.get(0))
        .map_err(|e| match e {
            duckdb::Error::QueryReturnedNoRows => {
                StoreError::Settings("settings row is missing".to_string())
            }
            other => StoreError::from(other),
        })?;
    serde_json::from_str(&raw)
        .map_err(|e| StoreError::Settings(format!("failed to parse settings: {e}")))
}

/// Overwrite the settings row.
pub fn save_settings(conn: &Connection, settings: &Settings) -> StoreResult<()> {
    let raw = serde_json::to_string(settings)
        .map_err(|e| StoreError::Settings(format!("failed to serialize settings: {e}")))?;
    let updated = conn.execute("UPDATE settings SET settings = ?", duckdb::params![raw])?;
    if updated != 1 {
        return Err(StoreError::Settings(format!(
            "expected exactly one settings row, found {updated}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE settings (settings VARCHAR NOT NULL);
             INSERT INTO settings (settings) VALUES ('{\"telemetry\":{\"enabled\":false}}');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let conn = settings_db();
        let mut settings = get_settings(&conn).unwrap();
        assert!(settings.encrypted_items.is_empty());
        settings.encrypted_items.push("colvault.agents.password".to_string());
        save_settings(&conn, &settings).unwrap();

        let reloaded = get_settings(&conn).unwrap();
        assert_eq!(reloaded.encrypted_items, vec!["colvault.agents.password"]);
        assert_eq!(
            reloaded.extra.get("telemetry"),
            Some(&serde_json::json!({"enabled": false}))
        );
    }

    #[test]
    fn test_fill_defaults_only_once() {
        let mut settings = Settings::default();
        assert!(settings.fill_defaults());
        let server_id = settings.server_id.clone();
        assert_eq!(settings.data_retention_days, Some(DEFAULT_DATA_RETENTION_DAYS));
        assert!(!settings.fill_defaults());
        assert_eq!(settings.server_id, server_id);
    }

    #[test]
    fn test_missing_row() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE settings (settings VARCHAR NOT NULL)")
            .unwrap();
        assert!(matches!(get_settings(&conn), Err(StoreError::Settings(_))));
    }

    #[test]
    fn test_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            get_settings(&conn),
            Err(StoreError::TableNotFound(_))
        ));
    }
}

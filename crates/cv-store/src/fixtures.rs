//! Default rows installed on first setup.
//!
//! Every fixture is inserted only when its row is missing, so re-running
//! setup writes nothing. Values for columns the ledger lists are sealed on
//! insert.

use crate::encryption::{EncryptionEngine, TableEncryptionSpec};
use crate::error::{StoreError, StoreResult};
use crate::ledger::EncryptionLedger;
use cv_core::Clock;
use duckdb::Connection;

/// Identifier of the node the server itself runs on.
pub const SERVER_NODE_ID: &str = "cv-server";
/// Identifier of the agent running alongside the server.
pub const SERVER_AGENT_ID: &str = "cv-server-agent";
/// Identifier of the server's own database service.
pub const SERVER_DB_SERVICE_ID: &str = "cv-server-db";
/// Identifier of the exporter watching the server's own database.
pub const SERVER_DB_EXPORTER_ID: &str = "cv-server-db-exporter";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Credentials the server uses to monitor its own database.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ServerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Seals fixture values bound for columns the ledger already lists, so a
/// fixture row added after the first encryption pass is stored encrypted.
pub struct FixtureSealer<'a> {
    ledger: &'a EncryptionLedger,
    encryption: Option<(&'a EncryptionEngine<'a>, &'a [TableEncryptionSpec])>,
}

impl<'a> FixtureSealer<'a> {
    /// Sealer without a key: writing to a ledgered column is an error.
    pub fn new(ledger: &'a EncryptionLedger) -> Self {
        Self {
            ledger,
            encryption: None,
        }
    }

    pub fn with_encryption(
        mut self,
        engine: &'a EncryptionEngine<'a>,
        tables: &'a [TableEncryptionSpec],
    ) -> Self {
        self.encryption = Some((engine, tables));
        self
    }

    /// Value to store in `table.column`: sealed if the ledger lists the
    /// column, unchanged otherwise.
    pub fn seal(&self, table: &str, column: &str, value: &str) -> StoreResult<String> {
        let Some(path) = self
            .ledger
            .iter()
            .find(|p| p.table() == table && p.column() == column)
        else {
            return Ok(value.to_string());
        };
        let Some((engine, tables)) = self.encryption else {
            return Err(StoreError::KeyRequired(path.to_string()));
        };
        let spec = tables
            .iter()
            .filter(|t| t.table == table)
            .flat_map(|t| t.columns.iter())
            .find(|c| c.name == column)
            .ok_or_else(|| StoreError::UncoveredColumns(path.to_string()))?;
        engine.seal_value(table, spec, value)
    }
}

/// Insert missing fixture rows. Returns true if anything was written.
pub fn install_fixtures(
    conn: &Connection,
    clock: &dyn Clock,
    credentials: Option<&ServerCredentials>,
    sealer: &FixtureSealer<'_>,
) -> StoreResult<bool> {
    let now = clock.now().format(TIMESTAMP_FORMAT).to_string();
    let mut written = false;

    if !row_exists(conn, "nodes", "node_id", SERVER_NODE_ID)? {
        conn.execute(
            "INSERT INTO nodes (node_id, node_type, node_name, address, created_at, updated_at)
             VALUES (?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            duckdb::params![
                SERVER_NODE_ID,
                sealer.seal("nodes", "node_type", "generic")?,
                sealer.seal("nodes", "node_name", SERVER_NODE_ID)?,
                sealer.seal("nodes", "address", "127.0.0.1")?,
                now,
                now
            ],
        )?;
        log::debug!("Installed fixture node {SERVER_NODE_ID}");
        written = true;
    }

    if !row_exists(conn, "agents", "agent_id", SERVER_AGENT_ID)? {
        conn.execute(
            "INSERT INTO agents (agent_id, agent_type, runs_on_node_id, created_at, updated_at)
             VALUES (?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            duckdb::params![
                SERVER_AGENT_ID,
                sealer.seal("agents", "agent_type", "server_agent")?,
                sealer.seal("agents", "runs_on_node_id", SERVER_NODE_ID)?,
                now,
                now
            ],
        )?;
        log::debug!("Installed fixture agent {SERVER_AGENT_ID}");
        written = true;
    }

    let Some(credentials) = credentials else {
        return Ok(written);
    };

    if !row_exists(conn, "services", "service_id", SERVER_DB_SERVICE_ID)? {
        conn.execute(
            "INSERT INTO services (service_id, service_type, service_name, node_id, address, port, created_at, updated_at)
             VALUES (?, ?, ?, ?, NULL, NULL, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            duckdb::params![
                SERVER_DB_SERVICE_ID,
                sealer.seal("services", "service_type", "duckdb")?,
                sealer.seal("services", "service_name", SERVER_DB_SERVICE_ID)?,
                sealer.seal("services", "node_id", SERVER_NODE_ID)?,
                now,
                now
            ],
        )?;
        written = true;
    }

    if !row_exists(conn, "agents", "agent_id", SERVER_DB_EXPORTER_ID)? {
        conn.execute(
            "INSERT INTO agents (agent_id, agent_type, service_id, username, password, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            duckdb::params![
                SERVER_DB_EXPORTER_ID,
                sealer.seal("agents", "agent_type", "db_exporter")?,
                sealer.seal("agents", "service_id", SERVER_DB_SERVICE_ID)?,
                sealer.seal("agents", "username", &credentials.username)?,
                sealer.seal("agents", "password", &credentials.password)?,
                now,
                now
            ],
        )?;
        log::debug!("Installed fixture agent {SERVER_DB_EXPORTER_ID}");
        written = true;
    }

    Ok(written)
}

fn row_exists(conn: &Connection, table: &str, key_column: &str, key: &str) -> StoreResult<bool> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {key_column} = ?");
    let count: i64 = conn.query_row(&sql, duckdb::params![key], |row| row.get(0))?;
    Ok(count > 0)
}

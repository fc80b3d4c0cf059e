//! Database schema definitions

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::LedgerError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), LedgerError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("creating ledger schema v{}", SCHEMA_VERSION);
        conn.execute_batch(LEDGER_SCHEMA)
            .map_err(|e| LedgerError::Storage(format!("failed to create tables: {e}")))?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(LedgerError::Storage(format!(
            "ledger schema v{current_version} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, LedgerError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| LedgerError::Storage(format!("failed to create schema_version table: {e}")))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|e| LedgerError::Storage(format!("failed to read schema_version: {e}")))?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), LedgerError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| LedgerError::Storage(format!("failed to clear schema_version: {e}")))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| LedgerError::Storage(format!("failed to set schema_version: {e}")))?;
    Ok(())
}

/// Supporters, claims, wallets, and the transaction log.
///
/// `claims.claim_id` and `claims.pow_hash` are unique at the storage layer;
/// claims and transactions reject UPDATE and DELETE.
const LEDGER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS supporters (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL UNIQUE,
    public_key_hex  TEXT NOT NULL UNIQUE,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS claims (
    claim_id        TEXT PRIMARY KEY,
    supporter_id    TEXT NOT NULL REFERENCES supporters(id),
    supporter       TEXT NOT NULL,
    action          TEXT NOT NULL,
    hours           REAL NOT NULL,
    timestamp       TEXT NOT NULL,
    evidence_uri    TEXT NOT NULL,
    evidence_hash   TEXT NOT NULL,
    nonce           INTEGER NOT NULL,
    attestation     TEXT NOT NULL,
    pow_hash        TEXT NOT NULL UNIQUE,
    status          TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS wallets (
    owner           TEXT PRIMARY KEY,
    token           TEXT NOT NULL,
    balance         INTEGER NOT NULL CHECK (balance >= 0)
);

CREATE TABLE IF NOT EXISTS transactions (
    id                  TEXT PRIMARY KEY,
    kind                TEXT NOT NULL,
    token               TEXT NOT NULL,
    amount              INTEGER NOT NULL CHECK (amount >= 0),
    owner               TEXT NOT NULL,
    timestamp           TEXT NOT NULL,
    related_claim_id    TEXT
);

CREATE INDEX IF NOT EXISTS idx_claims_supporter ON claims(supporter_id);
CREATE INDEX IF NOT EXISTS idx_transactions_owner ON transactions(owner);

CREATE TRIGGER IF NOT EXISTS claims_no_update BEFORE UPDATE ON claims
BEGIN SELECT RAISE(ABORT, 'claims are immutable'); END;
CREATE TRIGGER IF NOT EXISTS claims_no_delete BEFORE DELETE ON claims
BEGIN SELECT RAISE(ABORT, 'claims are immutable'); END;
CREATE TRIGGER IF NOT EXISTS transactions_no_update BEFORE UPDATE ON transactions
BEGIN SELECT RAISE(ABORT, 'transactions are append-only'); END;
CREATE TRIGGER IF NOT EXISTS transactions_no_delete BEFORE DELETE ON transactions
BEGIN SELECT RAISE(ABORT, 'transactions are append-only'); END;
"#;

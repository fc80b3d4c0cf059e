//! SQLite ledger backend.
//!
//! The durable store for an identity. Every write runs inside an immediate
//! transaction, so a failing step rolls the whole operation back, and the
//! replay keys are unique indexes rather than application checks.
//!
//! ## Tables
//!
//! - `supporters` - registered supporters (unique name, unique public key)
//! - `claims` - accepted claims (unique `claim_id`, unique `pow_hash`)
//! - `wallets` - one balance row per owner
//! - `transactions` - append-only deposit log

pub mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use mana_types::{
    parse_timestamp, ClaimPayload, ClaimRecord, Proof, SupporterId, SupporterRecord, Transaction,
    WalletState,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{LedgerError, ReplayField};
use crate::traits::{normalize_public_key, Deposit, LedgerReader, LedgerWriter};

/// SQLite-backed ledger.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open or create the ledger database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        info!("opening ledger database at {:?}", path);
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::Storage(format!("failed to open SQLite: {e}")))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        debug!("opening in-memory ledger database");
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::Storage(format!("failed to open in-memory SQLite: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA synchronous = FULL;")
            .map_err(|e| LedgerError::Storage(format!("failed to set PRAGMA: {e}")))?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Storage("ledger connection lock poisoned".into()))
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&Connection) -> Result<T, LedgerError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` in an immediate transaction; any error rolls it back.
    fn with_tx<F, T>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&Connection) -> Result<T, LedgerError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage)?;
        let out = f(&tx)?;
        tx.commit().map_err(storage)?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn storage(e: rusqlite::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

/// The SQLite message if `e` is a constraint violation.
fn constraint_message(e: &rusqlite::Error) -> Option<&str> {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(msg.as_deref().unwrap_or(""))
        }
        _ => None,
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64, LedgerError> {
    i64::try_from(value)
        .map_err(|_| LedgerError::Serialization(format!("{what} {value} exceeds storage range")))
}

fn to_u64(value: i64, what: &str) -> Result<u64, LedgerError> {
    u64::try_from(value)
        .map_err(|_| LedgerError::Serialization(format!("negative {what} {value} in storage")))
}

fn timestamp(s: &str) -> Result<chrono::DateTime<Utc>, LedgerError> {
    parse_timestamp(s).map_err(|e| LedgerError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

struct SupporterRow {
    id: String,
    name: String,
    public_key_hex: String,
    created_at: String,
}

impl SupporterRow {
    const COLUMNS: &'static str = "id, name, public_key_hex, created_at";

    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            public_key_hex: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_record(self) -> Result<SupporterRecord, LedgerError> {
        Ok(SupporterRecord {
            id: self
                .id
                .parse()
                .map_err(|e: mana_types::TypeError| LedgerError::Serialization(e.to_string()))?,
            name: self.name,
            public_key_hex: self.public_key_hex,
            created_at: timestamp(&self.created_at)?,
        })
    }
}

struct ClaimRow {
    payload: ClaimPayload,
    nonce: i64,
    attestation: String,
    pow_hash: String,
    supporter_id: String,
    status: String,
    created_at: String,
}

impl ClaimRow {
    const COLUMNS: &'static str = "claim_id, supporter, action, hours, timestamp, evidence_uri, \
         evidence_hash, nonce, attestation, pow_hash, supporter_id, status, created_at";

    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            payload: ClaimPayload {
                claim_id: row.get(0)?,
                supporter: row.get(1)?,
                action: row.get(2)?,
                hours: row.get(3)?,
                timestamp: row.get(4)?,
                evidence_uri: row.get(5)?,
                evidence_hash: row.get(6)?,
                nonce: 0,
            },
            nonce: row.get(7)?,
            attestation: row.get(8)?,
            pow_hash: row.get(9)?,
            supporter_id: row.get(10)?,
            status: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_record(self) -> Result<ClaimRecord, LedgerError> {
        let mut payload = self.payload;
        payload.nonce = to_u64(self.nonce, "nonce")?;
        Ok(ClaimRecord {
            proof: Proof {
                payload,
                attestation: self.attestation,
                pow_hash: self.pow_hash,
            },
            supporter_id: self
                .supporter_id
                .parse()
                .map_err(|e: mana_types::TypeError| LedgerError::Serialization(e.to_string()))?,
            status: self
                .status
                .parse()
                .map_err(|e: mana_types::TypeError| LedgerError::Serialization(e.to_string()))?,
            created_at: timestamp(&self.created_at)?,
        })
    }
}

struct TransactionRow {
    id: String,
    kind: String,
    token: String,
    amount: i64,
    owner: String,
    timestamp: String,
    related_claim_id: Option<String>,
}

impl TransactionRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            token: row.get(2)?,
            amount: row.get(3)?,
            owner: row.get(4)?,
            timestamp: row.get(5)?,
            related_claim_id: row.get(6)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction, LedgerError> {
        Ok(Transaction {
            id: uuid::Uuid::parse_str(&self.id)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?,
            kind: self
                .kind
                .parse()
                .map_err(|e: mana_types::TypeError| LedgerError::Serialization(e.to_string()))?,
            token: self.token,
            amount: to_u64(self.amount, "amount")?,
            owner: self.owner,
            timestamp: timestamp(&self.timestamp)?,
            related_claim_id: self.related_claim_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Write steps (run inside a transaction)
// ---------------------------------------------------------------------------

fn insert_claim(
    conn: &Connection,
    proof: &Proof,
    supporter_id: &SupporterId,
) -> Result<ClaimRecord, LedgerError> {
    let record = ClaimRecord::accepted(proof.clone(), supporter_id.clone());
    let p = &proof.payload;
    conn.execute(
        "INSERT INTO claims (claim_id, supporter_id, supporter, action, hours, timestamp, \
         evidence_uri, evidence_hash, nonce, attestation, pow_hash, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            p.claim_id,
            supporter_id.to_string(),
            p.supporter,
            p.action,
            p.hours,
            p.timestamp,
            p.evidence_uri,
            p.evidence_hash,
            to_i64(p.nonce, "nonce")?,
            proof.attestation,
            proof.pow_hash,
            record.status.as_str(),
            mana_types::format_timestamp(&record.created_at),
        ],
    )
    .map_err(|e| match constraint_message(&e) {
        Some(msg) if msg.contains("claims.pow_hash") => LedgerError::ReplayRejected {
            field: ReplayField::PowHash,
            value: proof.pow_hash.clone(),
        },
        Some(msg) if msg.contains("claims.claim_id") => LedgerError::ReplayRejected {
            field: ReplayField::ClaimId,
            value: p.claim_id.clone(),
        },
        Some(msg) if msg.contains("FOREIGN KEY") => {
            LedgerError::UnknownSupporter(supporter_id.to_string())
        }
        _ => storage(e),
    })?;
    Ok(record)
}

fn credit(
    conn: &Connection,
    deposit: &Deposit,
    related_claim_id: Option<&str>,
) -> Result<Transaction, LedgerError> {
    let current: Option<(String, i64)> = conn
        .query_row(
            "SELECT token, balance FROM wallets WHERE owner = ?1",
            [&deposit.owner],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(storage)?;

    let (token, balance) = current.unwrap_or_else(|| (deposit.token.clone(), 0));
    if token != deposit.token {
        return Err(LedgerError::TokenMismatch {
            owner: deposit.owner.clone(),
            wallet_token: token,
            requested: deposit.token.clone(),
        });
    }

    let new_balance = to_u64(balance, "balance")?
        .checked_add(deposit.amount)
        .and_then(|b| i64::try_from(b).ok())
        .ok_or_else(|| LedgerError::BalanceOverflow(deposit.owner.clone()))?;

    conn.execute(
        "INSERT INTO wallets (owner, token, balance) VALUES (?1, ?2, ?3) \
         ON CONFLICT(owner) DO UPDATE SET balance = excluded.balance",
        params![deposit.owner, deposit.token, new_balance],
    )
    .map_err(storage)?;

    let tx = Transaction::deposit(
        &deposit.owner,
        &deposit.token,
        deposit.amount,
        related_claim_id.map(str::to_string),
    );
    conn.execute(
        "INSERT INTO transactions (id, kind, token, amount, owner, timestamp, related_claim_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tx.id.to_string(),
            tx.kind.as_str(),
            tx.token,
            to_i64(tx.amount, "amount")?,
            tx.owner,
            mana_types::format_timestamp(&tx.timestamp),
            tx.related_claim_id,
        ],
    )
    .map_err(storage)?;

    Ok(tx)
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

impl LedgerReader for SqliteLedger {
    fn get_supporter_by_name(&self, name: &str) -> Result<Option<SupporterRecord>, LedgerError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM supporters WHERE name = ?1",
                SupporterRow::COLUMNS
            );
            conn.query_row(&sql, [name], SupporterRow::read)
                .optional()
                .map_err(storage)?
                .map(SupporterRow::into_record)
                .transpose()
        })
    }

    fn supporters(&self) -> Result<Vec<SupporterRecord>, LedgerError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM supporters ORDER BY created_at, rowid",
                SupporterRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql).map_err(storage)?;
            let rows = stmt
                .query_map([], SupporterRow::read)
                .map_err(storage)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage)?;
            rows.into_iter().map(SupporterRow::into_record).collect()
        })
    }

    fn has_claim(&self, claim_id: &str) -> Result<bool, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1 FROM claims WHERE claim_id = ?1", [claim_id], |_| Ok(()))
                .optional()
                .map(|found| found.is_some())
                .map_err(storage)
        })
    }

    fn has_pow_hash(&self, pow_hash: &str) -> Result<bool, LedgerError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1 FROM claims WHERE pow_hash = ?1", [pow_hash], |_| Ok(()))
                .optional()
                .map(|found| found.is_some())
                .map_err(storage)
        })
    }

    fn claim(&self, claim_id: &str) -> Result<Option<ClaimRecord>, LedgerError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM claims WHERE claim_id = ?1", ClaimRow::COLUMNS);
            conn.query_row(&sql, [claim_id], ClaimRow::read)
                .optional()
                .map_err(storage)?
                .map(ClaimRow::into_record)
                .transpose()
        })
    }

    fn claim_count(&self) -> Result<u64, LedgerError> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM claims", [], |row| row.get(0))
                .map_err(storage)?;
            to_u64(count, "count")
        })
    }

    fn wallet_state(&self, owner: &str) -> Result<WalletState, LedgerError> {
        self.with_conn(|conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT token, balance FROM wallets WHERE owner = ?1",
                    [owner],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(storage)?;
            match row {
                Some((token, balance)) => Ok(WalletState {
                    owner: owner.to_string(),
                    token,
                    balance: to_u64(balance, "balance")?,
                }),
                None => Ok(WalletState::empty(owner)),
            }
        })
    }

    fn transactions(&self, owner: &str) -> Result<Vec<Transaction>, LedgerError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, kind, token, amount, owner, timestamp, related_claim_id \
                     FROM transactions WHERE owner = ?1 ORDER BY rowid",
                )
                .map_err(storage)?;
            let rows = stmt
                .query_map([owner], TransactionRow::read)
                .map_err(storage)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage)?;
            rows.into_iter()
                .map(TransactionRow::into_transaction)
                .collect()
        })
    }
}

impl LedgerWriter for SqliteLedger {
    fn add_supporter(&self, name: &str, public_key_hex: &str) -> Result<SupporterId, LedgerError> {
        let public_key_hex = normalize_public_key(public_key_hex);
        let public_key_hex = public_key_hex.as_str();
        self.with_tx(|conn| {
            let id = SupporterId::new();
            conn.execute(
                "INSERT INTO supporters (id, name, public_key_hex, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.to_string(),
                    name,
                    public_key_hex,
                    mana_types::format_timestamp(&Utc::now()),
                ],
            )
            .map_err(|e| match constraint_message(&e) {
                Some(msg) if msg.contains("supporters.public_key_hex") => {
                    LedgerError::DuplicateKey(public_key_hex.to_string())
                }
                Some(msg) if msg.contains("supporters.name") => {
                    LedgerError::DuplicateName(name.to_string())
                }
                _ => storage(e),
            })?;
            Ok(id)
        })
    }

    fn ensure_wallet(&self, owner: &str, token: &str) -> Result<WalletState, LedgerError> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO wallets (owner, token, balance) VALUES (?1, ?2, 0) \
                 ON CONFLICT(owner) DO NOTHING",
                params![owner, token],
            )
            .map_err(storage)?;
            let (token, balance): (String, i64) = conn
                .query_row(
                    "SELECT token, balance FROM wallets WHERE owner = ?1",
                    [owner],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(storage)?;
            Ok(WalletState {
                owner: owner.to_string(),
                token,
                balance: to_u64(balance, "balance")?,
            })
        })
    }

    fn record_claim(
        &self,
        proof: &Proof,
        supporter_id: &SupporterId,
    ) -> Result<ClaimRecord, LedgerError> {
        self.with_tx(|conn| insert_claim(conn, proof, supporter_id))
    }

    fn deposit(
        &self,
        deposit: &Deposit,
        related_claim_id: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        self.with_tx(|conn| credit(conn, deposit, related_claim_id))
    }

    fn accept_claim(
        &self,
        proof: &Proof,
        supporter_id: &SupporterId,
        deposit: &Deposit,
    ) -> Result<(ClaimRecord, Transaction), LedgerError> {
        self.with_tx(|conn| {
            let record = insert_claim(conn, proof, supporter_id)?;
            let tx = credit(conn, deposit, Some(proof.claim_id()))?;
            Ok((record, tx))
        })
    }
}

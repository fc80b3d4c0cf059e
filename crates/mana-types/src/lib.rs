//! Foundation types for Astra Mana.
//!
//! This crate provides the data model shared by every other crate: the
//! signed claim payload, the exchanged proof record, and the ledger-resident
//! supporter, claim, wallet, and transaction rows.
//!
//! # Key Types
//!
//! - [`ClaimPayload`] - The eight canonical fields a supporter signs
//! - [`Proof`] - A payload plus its attestation and proof-of-work hash
//! - [`SupporterId`] - UUID v7 identifier for a registered supporter
//! - [`ClaimRecord`] - An accepted claim as persisted by the ledger
//! - [`WalletState`] / [`Transaction`] - Token balances and the audit log

pub mod claim;
pub mod error;
pub mod record;
pub mod supporter;
pub mod wallet;

pub use claim::{ClaimPayload, Proof, PROOF_FIELDS};
pub use error::TypeError;
pub use record::{ClaimRecord, ClaimStatus};
pub use supporter::{SupporterId, SupporterRecord};
pub use wallet::{Transaction, TransactionKind, WalletState, DEFAULT_TOKEN};

/// Render a UTC instant the way every persisted timestamp is written.
pub fn format_timestamp(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp (offset required) into UTC.
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, TypeError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))
}

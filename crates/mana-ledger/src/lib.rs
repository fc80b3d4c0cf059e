//! Ledger store for Astra Mana.
//!
//! This crate owns every persisted entity: supporters, accepted claims,
//! wallets, and the append-only transaction log. It provides:
//! - `LedgerReader` / `LedgerWriter` trait boundaries
//! - `SqliteLedger`, the durable backend with storage-level uniqueness on
//!   `claim_id` and `pow_hash`
//! - `InMemoryLedger` for tests and embedding
//!
//! Uniqueness enforced here is the real replay defence: application-level
//! `has_claim` / `has_pow_hash` checks are only a fast path, and a racing
//! duplicate still fails inside `record_claim` / `accept_claim` with
//! [`LedgerError::ReplayRejected`].

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{LedgerError, ReplayField};
pub use memory::InMemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{normalize_public_key, Deposit, Ledger, LedgerReader, LedgerWriter};

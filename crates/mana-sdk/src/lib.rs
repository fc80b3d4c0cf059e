//! High-level SDK for Astra Mana.
//!
//! [`Identity`] is the main entry point for an operator: it owns the ledger,
//! registers supporters, and verifies and credits submitted proofs.
//! [`SupporterKeys`] is the supporter-side counterpart that mines proofs.

pub mod config;
pub mod error;
pub mod identity;
pub mod supporter;

pub use config::{IdentityConfig, CONFIG_FILE};
pub use error::{IdentityError, IdentityResult};
pub use identity::Identity;
pub use supporter::SupporterKeys;

// Re-export key types
pub use mana_gate::{ClaimPolicy, VerificationError, VerificationReport};
pub use mana_ledger::{InMemoryLedger, SqliteLedger};
pub use mana_pow::{CancelToken, ClaimRequest, MineError};
pub use mana_types::{ClaimRecord, Proof, SupporterId, SupporterRecord, Transaction, WalletState};

//! Claim verification pipeline for Astra Mana.
//!
//! Every submitted proof must pass through the verifier before it can be
//! credited. The verifier runs an ordered pipeline of stages (presence,
//! replay, policy bounds, freshness, supporter lookup, signature, hash,
//! work) and stops at the first failure with a typed
//! [`VerificationError`] and a per-stage audit trail.
//!
//! # Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use mana_crypto::SigningKey;
//! use mana_gate::{ClaimPolicy, ClaimVerifier};
//! use mana_ledger::{InMemoryLedger, LedgerWriter};
//! use mana_pow::{mine_proof, CancelToken, ClaimRequest};
//!
//! let key = SigningKey::from_bytes([1u8; 32]);
//! let ledger = InMemoryLedger::new();
//! ledger.add_supporter("Grove", &key.verifying_key().to_hex()).unwrap();
//!
//! let proof = mine_proof(&key, "Grove", ClaimRequest::new("patrol", 0.5), &CancelToken::new()).unwrap();
//! let verifier = ClaimVerifier::with_default_stages(ClaimPolicy::default());
//! let verified = verifier.verify(&proof, &ledger, Utc::now()).unwrap();
//! assert_eq!(verified.reward, 5);
//! ```

pub mod config;
pub mod error;
pub mod stage;
pub mod stages;
pub mod verifier;

pub use config::ClaimPolicy;
pub use error::VerificationError;
pub use stage::{ClaimContext, ClaimStage, StageResult};
pub use stages::{
    FreshnessStage, HoursBoundStage, PowHashStage, PresenceStage, ReplayStage, SignatureStage,
    SupporterStage, WorkStage,
};
pub use verifier::{ClaimVerifier, VerificationReport, VerifiedClaim};

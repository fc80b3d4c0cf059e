//! Proof-of-work for Astra Mana.
//!
//! - [`difficulty`] maps claimed hours to the number of leading zero hex
//!   digits a proof's hash must carry.
//! - [`miner`] is the supporter-side search: sign the canonical payload,
//!   hash payload and signature together, bump the nonce until the hash meets
//!   the target. The search is lazy, resumable, and cancelable.

pub mod difficulty;
pub mod error;
pub mod miner;

pub use difficulty::{expected_attempts, required_zero_prefix, DIFFICULTY_TIERS, MAX_DIFFICULTY};
pub use error::MineError;
pub use miner::{mine_proof, CancelToken, Candidate, ClaimRequest, ProofMiner, ProofSearch};

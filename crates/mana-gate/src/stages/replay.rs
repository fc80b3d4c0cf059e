use mana_types::Proof;

use crate::error::VerificationError;
use crate::stage::{ClaimContext, ClaimStage};

/// Fast-path replay check on both replay keys.
///
/// A fresh `claim_id` with a reused `pow_hash` is as much a replay as the
/// reverse. The ledger's unique indexes still catch a duplicate that races
/// past this read.
pub struct ReplayStage;

impl ClaimStage for ReplayStage {
    fn name(&self) -> &str {
        "replay"
    }

    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        if context.ledger.has_claim(proof.claim_id())? {
            return Err(VerificationError::ReplayRejected(format!(
                "claim_id '{}' already accepted",
                proof.claim_id()
            )));
        }
        if context.ledger.has_pow_hash(&proof.pow_hash)? {
            return Err(VerificationError::ReplayRejected(format!(
                "pow_hash '{}' already accepted",
                proof.pow_hash
            )));
        }
        Ok(())
    }
}

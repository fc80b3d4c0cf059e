use mana_pow::required_zero_prefix;
use mana_types::Proof;

use crate::error::VerificationError;
use crate::stage::{ClaimContext, ClaimStage};

/// The recomputed hash must carry the difficulty the claimed hours require.
pub struct WorkStage;

impl ClaimStage for WorkStage {
    fn name(&self) -> &str {
        "work"
    }

    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        let required = required_zero_prefix(proof.hours());
        let actual = context.pow_hash(proof)?.leading_zero_digits();
        if actual >= required {
            Ok(())
        } else {
            Err(VerificationError::InsufficientWork { required, actual })
        }
    }
}

use mana_types::Proof;

use crate::error::VerificationError;
use crate::stage::{ClaimContext, ClaimStage};

/// The named supporter must be registered.
pub struct SupporterStage;

impl ClaimStage for SupporterStage {
    fn name(&self) -> &str {
        "supporter"
    }

    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        context.supporter(proof).map(|_| ())
    }
}

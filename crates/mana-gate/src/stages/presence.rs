use mana_types::Proof;

use crate::error::VerificationError;
use crate::stage::{ClaimContext, ClaimStage};

/// Field presence.
///
/// Missing or mistyped fields are already rejected when a [`Proof`] is
/// parsed. This stage catches a proof whose attestation or hash was never
/// filled in. Payload text such as `action` may be empty.
pub struct PresenceStage;

impl ClaimStage for PresenceStage {
    fn name(&self) -> &str {
        "presence"
    }

    fn check(&self, proof: &Proof, _context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        let blank = proof.unsealed_fields();
        if blank.is_empty() {
            Ok(())
        } else {
            Err(VerificationError::MalformedProof(format!(
                "blank required field(s): {}",
                blank.join(", ")
            )))
        }
    }
}

use mana_types::Proof;

use crate::error::VerificationError;
use crate::stage::{ClaimContext, ClaimStage};

/// Hours must lie in `(0, max_hours_per_claim]`.
pub struct HoursBoundStage;

impl ClaimStage for HoursBoundStage {
    fn name(&self) -> &str {
        "hours-bound"
    }

    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        let hours = proof.hours();
        if context.policy.allows_hours(hours) {
            Ok(())
        } else {
            Err(VerificationError::PolicyViolation(format!(
                "hours {hours} outside (0, {}]",
                context.policy.max_hours_per_claim
            )))
        }
    }
}

/// The claim timestamp must not be after verification time.
///
/// There is no tolerance window. A timestamp that does not parse is
/// malformed rather than a policy matter.
pub struct FreshnessStage;

impl ClaimStage for FreshnessStage {
    fn name(&self) -> &str {
        "freshness"
    }

    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        let at = proof.payload.timestamp_utc()?;
        if at > context.now {
            return Err(VerificationError::PolicyViolation(format!(
                "timestamp {} is in the future",
                proof.payload.timestamp
            )));
        }
        Ok(())
    }
}

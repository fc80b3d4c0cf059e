use mana_crypto::verify;
use mana_types::Proof;

use crate::error::VerificationError;
use crate::stage::{ClaimContext, ClaimStage};

/// The attestation must verify against the registered key, over canonical
/// bytes the verifier rebuilds itself.
pub struct SignatureStage;

impl ClaimStage for SignatureStage {
    fn name(&self) -> &str {
        "signature"
    }

    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        let key = context.supporter(proof)?.1.clone();
        let message = context.canonical(proof)?.to_vec();
        let signature = context.signature(proof)?;
        if verify(&key, signature, &message) {
            Ok(())
        } else {
            Err(VerificationError::SignatureInvalid(proof.claim_id().into()))
        }
    }
}

/// The stated `pow_hash` must equal `SHA256(canonical || signature)`.
pub struct PowHashStage;

impl ClaimStage for PowHashStage {
    fn name(&self) -> &str {
        "pow-hash"
    }

    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>) -> Result<(), VerificationError> {
        let computed = context.pow_hash(proof)?.to_hex();
        if computed == proof.pow_hash {
            Ok(())
        } else {
            Err(VerificationError::HashMismatch {
                stated: proof.pow_hash.clone(),
                computed,
            })
        }
    }
}

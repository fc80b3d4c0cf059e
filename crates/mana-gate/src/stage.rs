use std::time::Duration;

use chrono::{DateTime, Utc};
use mana_crypto::{canonicalize, public_from_hex, PowHash, VerifyingKey};
use mana_ledger::LedgerReader;
use mana_types::{Proof, SupporterRecord};

use crate::config::ClaimPolicy;
use crate::error::VerificationError;

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    /// Name of the stage that produced this result.
    pub stage_name: String,
    /// Whether the stage passed.
    pub passed: bool,
    /// Failure reason, if the stage rejected the proof.
    pub reason: Option<String>,
    /// Wall-clock time the stage took to evaluate.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// ClaimContext
// ---------------------------------------------------------------------------

/// State shared by every stage during one verification.
///
/// Values derived from the proof (the supporter's key, the canonical bytes,
/// the decoded signature, the recomputed hash) are computed on first use and
/// cached, so later stages reuse what earlier ones derived and any stage can
/// run on its own.
pub struct ClaimContext<'a> {
    pub policy: &'a ClaimPolicy,
    pub ledger: &'a dyn LedgerReader,
    /// Verification time; timestamps after this are rejected.
    pub now: DateTime<Utc>,
    /// Results from stages that have already run in this evaluation.
    pub previous_stages: Vec<StageResult>,
    supporter: Option<(SupporterRecord, VerifyingKey)>,
    canonical: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
    pow_hash: Option<PowHash>,
}

impl<'a> ClaimContext<'a> {
    pub fn new(policy: &'a ClaimPolicy, ledger: &'a dyn LedgerReader, now: DateTime<Utc>) -> Self {
        Self {
            policy,
            ledger,
            now,
            previous_stages: Vec::new(),
            supporter: None,
            canonical: None,
            signature: None,
            pow_hash: None,
        }
    }

    /// The registered supporter named by the proof, and their key.
    pub fn supporter(
        &mut self,
        proof: &Proof,
    ) -> Result<&(SupporterRecord, VerifyingKey), VerificationError> {
        let entry = match self.supporter.take() {
            Some(entry) => entry,
            None => {
                let record = self
                    .ledger
                    .get_supporter_by_name(proof.supporter())?
                    .ok_or_else(|| VerificationError::UnknownSupporter(proof.supporter().into()))?;
                let key = public_from_hex(&record.public_key_hex).map_err(|e| {
                    VerificationError::Storage(format!(
                        "registered key for '{}' is unusable: {e}",
                        record.name
                    ))
                })?;
                (record, key)
            }
        };
        Ok(self.supporter.insert(entry))
    }

    /// Canonical bytes rebuilt from the payload fields.
    pub fn canonical(&mut self, proof: &Proof) -> Result<&[u8], VerificationError> {
        let bytes = match self.canonical.take() {
            Some(bytes) => bytes,
            None => canonicalize(&proof.payload)?,
        };
        Ok(self.canonical.insert(bytes))
    }

    /// Raw attestation bytes. Undecodable hex is an invalid signature.
    pub fn signature(&mut self, proof: &Proof) -> Result<&[u8], VerificationError> {
        let bytes = match self.signature.take() {
            Some(bytes) => bytes,
            None => hex::decode(&proof.attestation)
                .map_err(|_| VerificationError::SignatureInvalid(proof.claim_id().into()))?,
        };
        Ok(self.signature.insert(bytes))
    }

    /// `SHA256(canonical || signature)` as recomputed by the verifier.
    pub fn pow_hash(&mut self, proof: &Proof) -> Result<PowHash, VerificationError> {
        if let Some(hash) = self.pow_hash {
            return Ok(hash);
        }
        let canonical = self.canonical(proof)?.to_vec();
        let hash = PowHash::compute(&canonical, self.signature(proof)?);
        self.pow_hash = Some(hash);
        Ok(hash)
    }
}

// ---------------------------------------------------------------------------
// ClaimStage trait
// ---------------------------------------------------------------------------

/// A single check in the verification pipeline.
///
/// Stages run in order and the first failure ends the evaluation, so cheap
/// checks belong before expensive ones. The trait is object-safe and
/// `Send + Sync` so stages can be stored in a `Vec<Box<dyn ClaimStage>>`.
pub trait ClaimStage: Send + Sync {
    /// Human-readable name of this stage (e.g., "presence", "signature").
    fn name(&self) -> &str;

    /// Check the proof; `Err` rejects it.
    fn check(&self, proof: &Proof, context: &mut ClaimContext<'_>)
        -> Result<(), VerificationError>;
}

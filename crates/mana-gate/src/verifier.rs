use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mana_ledger::LedgerReader;
use mana_pow::required_zero_prefix;
use mana_types::{Proof, SupporterId};
use tracing::{debug, warn};

use crate::config::ClaimPolicy;
use crate::error::VerificationError;
use crate::stage::{ClaimContext, ClaimStage, StageResult};
use crate::stages::{
    FreshnessStage, HoursBoundStage, PowHashStage, PresenceStage, ReplayStage, SignatureStage,
    SupporterStage, WorkStage,
};

// ---------------------------------------------------------------------------
// VerifiedClaim / VerificationReport
// ---------------------------------------------------------------------------

/// A proof that passed every stage, with what it earns.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedClaim {
    pub claim_id: String,
    pub supporter_id: SupporterId,
    pub supporter_name: String,
    /// Leading zero hex digits the hours required.
    pub difficulty: u32,
    /// Leading zero hex digits the hash actually has.
    pub leading_zeros: u32,
    /// Reward under the policy, already rounded.
    pub reward: u64,
}

/// The outcome of running a proof through the full pipeline.
#[derive(Clone, Debug)]
pub struct VerificationReport {
    pub outcome: Result<VerifiedClaim, VerificationError>,
    /// Per-stage results in evaluation order; ends at the failing stage.
    pub stage_results: Vec<StageResult>,
    /// Total wall-clock time for the pipeline evaluation.
    pub elapsed: Duration,
}

impl VerificationReport {
    pub fn is_accepted(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Name of the stage that rejected the proof, if any.
    pub fn failed_stage(&self) -> Option<&str> {
        self.stage_results
            .iter()
            .find(|r| !r.passed)
            .map(|r| r.stage_name.as_str())
    }
}

// ---------------------------------------------------------------------------
// ClaimVerifier
// ---------------------------------------------------------------------------

/// Identity-side verifier: an ordered pipeline of stages every proof must
/// pass before it can be credited.
///
/// The verifier only reads the ledger. Persisting an accepted claim is the
/// caller's job, and the ledger's own uniqueness constraints remain the
/// final word on replays.
pub struct ClaimVerifier {
    stages: Vec<Box<dyn ClaimStage>>,
    policy: ClaimPolicy,
}

impl ClaimVerifier {
    /// Create a verifier with an empty pipeline.
    pub fn new(policy: ClaimPolicy) -> Self {
        Self {
            stages: Vec::new(),
            policy,
        }
    }

    /// Create a verifier with the standard pipeline, cheapest checks first:
    /// Presence -> Replay -> HoursBound -> Freshness -> Supporter ->
    /// Signature -> PowHash -> Work
    pub fn with_default_stages(policy: ClaimPolicy) -> Self {
        let mut verifier = Self::new(policy);
        verifier.add_stage(Box::new(PresenceStage));
        verifier.add_stage(Box::new(ReplayStage));
        verifier.add_stage(Box::new(HoursBoundStage));
        verifier.add_stage(Box::new(FreshnessStage));
        verifier.add_stage(Box::new(SupporterStage));
        verifier.add_stage(Box::new(SignatureStage));
        verifier.add_stage(Box::new(PowHashStage));
        verifier.add_stage(Box::new(WorkStage));
        verifier
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn ClaimStage>) {
        self.stages.push(stage);
    }

    pub fn policy(&self) -> &ClaimPolicy {
        &self.policy
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Verify `proof` at time `now`.
    pub fn verify(
        &self,
        proof: &Proof,
        ledger: &dyn LedgerReader,
        now: DateTime<Utc>,
    ) -> Result<VerifiedClaim, VerificationError> {
        self.evaluate(proof, ledger, now).outcome
    }

    /// Run the full pipeline and keep the per-stage audit trail.
    ///
    /// The pipeline is **fail-fast**: the first stage that fails stops
    /// evaluation.
    pub fn evaluate(
        &self,
        proof: &Proof,
        ledger: &dyn LedgerReader,
        now: DateTime<Utc>,
    ) -> VerificationReport {
        let pipeline_start = Instant::now();
        let mut context = ClaimContext::new(&self.policy, ledger, now);
        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let checked = stage.check(proof, &mut context);
            let elapsed = stage_start.elapsed();

            let result = StageResult {
                stage_name: stage.name().to_string(),
                passed: checked.is_ok(),
                reason: checked.as_ref().err().map(ToString::to_string),
                elapsed,
            };
            debug!(
                claim_id = %proof.claim_id(),
                stage = stage.name(),
                passed = result.passed,
                elapsed_us = elapsed.as_micros() as u64,
                "verifier stage"
            );
            stage_results.push(result.clone());
            context.previous_stages.push(result);

            if let Err(err) = checked {
                warn!(
                    claim_id = %proof.claim_id(),
                    supporter = %proof.supporter(),
                    stage = stage.name(),
                    error = %err,
                    "claim rejected"
                );
                return VerificationReport {
                    outcome: Err(err),
                    stage_results,
                    elapsed: pipeline_start.elapsed(),
                };
            }
        }

        let outcome = self.finish(proof, &mut context);
        VerificationReport {
            outcome,
            stage_results,
            elapsed: pipeline_start.elapsed(),
        }
    }

    fn finish(
        &self,
        proof: &Proof,
        context: &mut ClaimContext<'_>,
    ) -> Result<VerifiedClaim, VerificationError> {
        let (record, _) = context.supporter(proof)?;
        let supporter_id = record.id.clone();
        let supporter_name = record.name.clone();
        let leading_zeros = context.pow_hash(proof)?.leading_zero_digits();
        Ok(VerifiedClaim {
            claim_id: proof.claim_id().to_string(),
            supporter_id,
            supporter_name,
            difficulty: required_zero_prefix(proof.hours()),
            leading_zeros,
            reward: self.policy.reward_for(proof.hours()),
        })
    }
}

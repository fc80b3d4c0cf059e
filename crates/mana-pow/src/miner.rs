use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mana_crypto::{canonicalize, PowHash, SigningKey};
use mana_types::{ClaimPayload, Proof};
use tracing::{debug, info};

use crate::difficulty::required_zero_prefix;
use crate::error::MineError;

/// Attempts between progress log lines.
const PROGRESS_INTERVAL: u64 = 4096;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Shared flag that stops a running search at its next attempt.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// ClaimRequest
// ---------------------------------------------------------------------------

/// What a supporter wants to claim, before identifiers and nonce are fixed.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimRequest {
    pub action: String,
    pub hours: f64,
    pub evidence_uri: String,
    pub evidence_hash: String,
}

impl ClaimRequest {
    pub fn new(action: impl Into<String>, hours: f64) -> Self {
        Self {
            action: action.into(),
            hours,
            evidence_uri: String::new(),
            evidence_hash: String::new(),
        }
    }

    pub fn with_evidence(mut self, uri: impl Into<String>, hash: impl Into<String>) -> Self {
        self.evidence_uri = uri.into();
        self.evidence_hash = hash.into();
        self
    }

    /// Fix a fresh claim id and the current UTC time, starting at nonce 0.
    pub fn into_payload(self, supporter: impl Into<String>) -> ClaimPayload {
        ClaimPayload {
            claim_id: uuid::Uuid::new_v4().to_string(),
            supporter: supporter.into(),
            action: self.action,
            hours: self.hours,
            timestamp: mana_types::format_timestamp(&chrono::Utc::now()),
            evidence_uri: self.evidence_uri,
            evidence_hash: self.evidence_hash,
            nonce: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ProofSearch
// ---------------------------------------------------------------------------

/// One signed, hashed attempt at a given nonce.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub proof: Proof,
    pub hash: PowHash,
}

impl Candidate {
    pub fn nonce(&self) -> u64 {
        self.proof.payload.nonce
    }

    pub fn meets(&self, difficulty: u32) -> bool {
        self.hash.meets(difficulty)
    }
}

/// Lazy search over the nonce space of a fixed payload.
///
/// Each item is a fully signed and hashed [`Candidate`], whether or not it
/// meets any difficulty. The search can be paused by dropping it and
/// resumed from [`Self::next_nonce`] with [`Self::resume_at`].
pub struct ProofSearch<'k> {
    key: &'k SigningKey,
    payload: ClaimPayload,
    next_nonce: Option<u64>,
}

impl<'k> ProofSearch<'k> {
    /// Start searching at `payload.nonce`.
    pub fn new(key: &'k SigningKey, payload: ClaimPayload) -> Result<Self, MineError> {
        if !payload.hours.is_finite() || payload.hours <= 0.0 {
            return Err(MineError::InvalidHours(format!(
                "hours must be positive and finite, got {}",
                payload.hours
            )));
        }
        let next_nonce = Some(payload.nonce);
        Ok(Self {
            key,
            payload,
            next_nonce,
        })
    }

    /// Nonce the next attempt will use; `None` once the space is exhausted.
    pub fn next_nonce(&self) -> Option<u64> {
        self.next_nonce
    }

    pub fn resume_at(&mut self, nonce: u64) {
        self.next_nonce = Some(nonce);
    }

    pub fn payload(&self) -> &ClaimPayload {
        &self.payload
    }

    /// Sign and hash the payload at `nonce`.
    pub fn attempt(&self, nonce: u64) -> Result<Candidate, MineError> {
        let mut payload = self.payload.clone();
        payload.nonce = nonce;
        let canonical = canonicalize(&payload)?;
        let signature = self.key.sign(&canonical);
        let hash = PowHash::compute(&canonical, &signature.to_bytes());
        Ok(Candidate {
            proof: Proof {
                payload,
                attestation: signature.to_hex(),
                pow_hash: hash.to_hex(),
            },
            hash,
        })
    }
}

impl Iterator for ProofSearch<'_> {
    type Item = Result<Candidate, MineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let nonce = self.next_nonce?;
        self.next_nonce = nonce.checked_add(1);
        Some(self.attempt(nonce))
    }
}

// ---------------------------------------------------------------------------
// ProofMiner
// ---------------------------------------------------------------------------

/// Supporter-side miner bound to a signing key and a supporter name.
pub struct ProofMiner<'k> {
    key: &'k SigningKey,
    supporter: String,
    max_attempts: Option<u64>,
}

impl<'k> ProofMiner<'k> {
    pub fn new(key: &'k SigningKey, supporter: impl Into<String>) -> Self {
        Self {
            key,
            supporter: supporter.into(),
            max_attempts: None,
        }
    }

    /// Give up with [`MineError::Exhausted`] after this many attempts.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Build a fresh payload for `request` and mine it.
    pub fn mine(&self, request: ClaimRequest, cancel: &CancelToken) -> Result<Proof, MineError> {
        let payload = request.into_payload(self.supporter.clone());
        self.mine_payload(payload, cancel)
    }

    /// Mine a prepared payload, starting at its current nonce.
    ///
    /// Deterministic: the same key and payload always yield the same proof.
    pub fn mine_payload(
        &self,
        payload: ClaimPayload,
        cancel: &CancelToken,
    ) -> Result<Proof, MineError> {
        let difficulty = required_zero_prefix(payload.hours);
        let claim_id = payload.claim_id.clone();
        let search = ProofSearch::new(self.key, payload)?;
        let mut attempts: u64 = 0;

        for candidate in search {
            if cancel.is_cancelled() {
                return Err(MineError::Cancelled { attempts });
            }
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(MineError::Exhausted { attempts });
            }
            let candidate = candidate?;
            attempts += 1;

            if candidate.meets(difficulty) {
                info!(
                    claim_id = %claim_id,
                    nonce = candidate.nonce(),
                    attempts,
                    difficulty,
                    "proof mined"
                );
                return Ok(candidate.proof);
            }
            if attempts % PROGRESS_INTERVAL == 0 {
                debug!(claim_id = %claim_id, attempts, difficulty, "mining");
            }
        }

        Err(MineError::Exhausted { attempts })
    }
}

/// Mine a proof for `request` signed by `key` on behalf of `supporter`.
pub fn mine_proof(
    key: &SigningKey,
    supporter: &str,
    request: ClaimRequest,
    cancel: &CancelToken,
) -> Result<Proof, MineError> {
    ProofMiner::new(key, supporter).mine(request, cancel)
}

use mana_crypto::CodecError;
use mana_ledger::LedgerError;
use mana_types::TypeError;

/// Why a submitted proof was not accepted.
///
/// Every variant is terminal for the submission. A corrected proof is a new
/// submission, not a retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerificationError {
    /// The proof is structurally incomplete or unparseable.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// The `claim_id` or `pow_hash` has already been accepted.
    #[error("replay rejected: {0}")]
    ReplayRejected(String),

    /// Hours out of bounds, or a timestamp in the future.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// The named supporter is not registered.
    #[error("unknown supporter: {0}")]
    UnknownSupporter(String),

    /// The attestation does not verify against the registered key.
    #[error("signature invalid for claim '{0}'")]
    SignatureInvalid(String),

    /// The stated `pow_hash` differs from the recomputed one.
    #[error("pow_hash mismatch: stated {stated}, computed {computed}")]
    HashMismatch { stated: String, computed: String },

    /// The hash has fewer leading zero hex digits than the hours require.
    #[error("insufficient work: {required} leading zero hex digits required, found {actual}")]
    InsufficientWork { required: u32, actual: u32 },

    /// The ledger failed underneath the pipeline.
    #[error("storage error: {0}")]
    Storage(String),
}

impl VerificationError {
    /// Stable variant name, for machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedProof(_) => "MalformedProof",
            Self::ReplayRejected(_) => "ReplayRejected",
            Self::PolicyViolation(_) => "PolicyViolation",
            Self::UnknownSupporter(_) => "UnknownSupporter",
            Self::SignatureInvalid(_) => "SignatureInvalid",
            Self::HashMismatch { .. } => "HashMismatch",
            Self::InsufficientWork { .. } => "InsufficientWork",
            Self::Storage(_) => "StorageError",
        }
    }
}

impl From<LedgerError> for VerificationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ReplayRejected { .. } => Self::ReplayRejected(err.to_string()),
            LedgerError::UnknownSupporter(name) => Self::UnknownSupporter(name),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<TypeError> for VerificationError {
    fn from(err: TypeError) -> Self {
        Self::MalformedProof(err.to_string())
    }
}

impl From<CodecError> for VerificationError {
    fn from(err: CodecError) -> Self {
        Self::MalformedProof(err.to_string())
    }
}

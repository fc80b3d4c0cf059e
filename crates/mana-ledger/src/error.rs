use std::fmt;

/// Which replay key a duplicate submission collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayField {
    ClaimId,
    PowHash,
}

impl fmt::Display for ReplayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClaimId => "claim_id",
            Self::PowHash => "pow_hash",
        })
    }
}

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("public key already registered: {0}")]
    DuplicateKey(String),

    #[error("supporter name already registered: {0}")]
    DuplicateName(String),

    #[error("replay rejected: duplicate {field} '{value}'")]
    ReplayRejected { field: ReplayField, value: String },

    #[error("supporter not found: {0}")]
    UnknownSupporter(String),

    #[error("wallet for '{owner}' holds {wallet_token}, cannot credit {requested}")]
    TokenMismatch {
        owner: String,
        wallet_token: String,
        requested: String,
    },

    #[error("balance overflow for '{0}'")]
    BalanceOverflow(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn is_replay(&self) -> bool {
        matches!(self, Self::ReplayRejected { .. })
    }
}

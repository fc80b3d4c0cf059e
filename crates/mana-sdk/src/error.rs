use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("verification failed: {0}")]
    Verification(#[from] mana_gate::VerificationError),

    #[error("ledger error: {0}")]
    Ledger(#[from] mana_ledger::LedgerError),

    #[error("invalid public key: {0}")]
    InvalidKey(#[from] mana_crypto::SignatureError),

    #[error("mining failed: {0}")]
    Mining(#[from] mana_pow::MineError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

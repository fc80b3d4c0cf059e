use mana_crypto::CodecError;

/// Errors from proof mining.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MineError {
    /// The caller tripped the cancel token.
    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    /// The attempt budget or the nonce space ran out.
    #[error("no proof found within {attempts} attempts")]
    Exhausted { attempts: u64 },

    #[error("invalid hours: {0}")]
    InvalidHours(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

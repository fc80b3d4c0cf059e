use mana_types::{ClaimRecord, Proof, SupporterId, SupporterRecord, Transaction, WalletState};

use crate::error::LedgerError;

/// A credit to apply to an owner's wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deposit {
    pub owner: String,
    pub token: String,
    pub amount: u64,
}

/// Read boundary for ledger queries.
pub trait LedgerReader: Send + Sync {
    fn get_supporter_by_name(&self, name: &str) -> Result<Option<SupporterRecord>, LedgerError>;

    fn supporters(&self) -> Result<Vec<SupporterRecord>, LedgerError>;

    fn has_claim(&self, claim_id: &str) -> Result<bool, LedgerError>;

    fn has_pow_hash(&self, pow_hash: &str) -> Result<bool, LedgerError>;

    fn claim(&self, claim_id: &str) -> Result<Option<ClaimRecord>, LedgerError>;

    fn claim_count(&self) -> Result<u64, LedgerError>;

    /// Current wallet for `owner`; a zero balance if none exists yet.
    fn wallet_state(&self, owner: &str) -> Result<WalletState, LedgerError>;

    /// Transactions for `owner`, oldest first.
    fn transactions(&self, owner: &str) -> Result<Vec<Transaction>, LedgerError>;
}

/// Canonical stored form of a hex public key: trimmed, lowercase.
pub fn normalize_public_key(public_key_hex: &str) -> String {
    public_key_hex.trim().to_ascii_lowercase()
}

/// Write boundary for ledger mutations.
///
/// Every method is atomic: on error the ledger is left exactly as it was.
pub trait LedgerWriter: Send + Sync {
    /// Register a supporter. The key is stored as
    /// [`normalize_public_key`] returns it. Fails with `DuplicateKey` if the
    /// public key is already registered in any case and `DuplicateName` if
    /// the name is taken.
    fn add_supporter(&self, name: &str, public_key_hex: &str) -> Result<SupporterId, LedgerError>;

    /// Create an empty wallet for `owner` if none exists.
    fn ensure_wallet(&self, owner: &str, token: &str) -> Result<WalletState, LedgerError>;

    /// Persist an accepted claim. Fails with `ReplayRejected` on a duplicate
    /// `claim_id` or `pow_hash`, and `UnknownSupporter` if `supporter_id`
    /// does not resolve.
    fn record_claim(
        &self,
        proof: &Proof,
        supporter_id: &SupporterId,
    ) -> Result<ClaimRecord, LedgerError>;

    /// Credit a wallet and append the matching transaction.
    fn deposit(
        &self,
        deposit: &Deposit,
        related_claim_id: Option<&str>,
    ) -> Result<Transaction, LedgerError>;

    /// Record a claim and credit its reward as one unit: both happen or
    /// neither does.
    fn accept_claim(
        &self,
        proof: &Proof,
        supporter_id: &SupporterId,
        deposit: &Deposit,
    ) -> Result<(ClaimRecord, Transaction), LedgerError>;
}

/// Anything that can be both read and written.
pub trait Ledger: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter> Ledger for T {}

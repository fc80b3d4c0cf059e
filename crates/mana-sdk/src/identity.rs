use chrono::{DateTime, Utc};
use mana_crypto::public_from_hex;
use mana_gate::{ClaimPolicy, ClaimVerifier, VerificationError, VerificationReport};
use mana_ledger::{Deposit, Ledger, SqliteLedger};
use mana_types::{ClaimRecord, Proof, SupporterId, SupporterRecord, Transaction, WalletState};
use tracing::{info, warn};

use crate::config::IdentityConfig;
use crate::error::IdentityResult;

/// A non-human identity: owns a ledger, registers supporters, and credits
/// its own wallet for every proof it accepts.
///
/// Holds no state beyond its configuration; everything persistent lives in
/// the ledger.
pub struct Identity<L = SqliteLedger> {
    config: IdentityConfig,
    verifier: ClaimVerifier,
    ledger: L,
}

impl Identity<SqliteLedger> {
    /// Open the SQLite ledger at `config.db_path`, creating it if needed.
    pub fn open(config: IdentityConfig) -> IdentityResult<Self> {
        config.validate()?;
        let ledger = SqliteLedger::open(&config.db_path)?;
        Self::with_ledger(config, ledger)
    }
}

impl<L: Ledger> Identity<L> {
    /// Build an identity over an existing ledger and make sure its wallet
    /// exists.
    pub fn with_ledger(config: IdentityConfig, ledger: L) -> IdentityResult<Self> {
        config.validate()?;
        let wallet = ledger.ensure_wallet(&config.name, &config.token)?;
        info!(
            identity = %config.name,
            token = %wallet.token,
            balance = wallet.balance,
            "identity ready"
        );
        Ok(Self {
            verifier: ClaimVerifier::with_default_stages(config.policy()),
            config,
            ledger,
        })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    pub fn policy(&self) -> &ClaimPolicy {
        self.verifier.policy()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Register a supporter's public key under a unique name.
    ///
    /// The key must decode as a valid public key; it is stored in canonical
    /// lowercase hex.
    pub fn register_supporter(&self, name: &str, public_key_hex: &str) -> IdentityResult<SupporterId> {
        let key = public_from_hex(public_key_hex.trim())?;
        let id = self.ledger.add_supporter(name, &key.to_hex())?;
        info!(supporter = %name, id = %id, "supporter registered");
        Ok(id)
    }

    /// Verify `proof` against the current time and, if it passes, record it
    /// and credit the reward in one atomic step. Returns the reward.
    pub fn verify_and_accept(&self, proof: &Proof) -> Result<u64, VerificationError> {
        self.verify_and_accept_at(proof, Utc::now())
    }

    /// [`Self::verify_and_accept`] with an explicit verification time.
    pub fn verify_and_accept_at(
        &self,
        proof: &Proof,
        now: DateTime<Utc>,
    ) -> Result<u64, VerificationError> {
        let verified = self.verifier.verify(proof, &self.ledger, now)?;
        let deposit = Deposit {
            owner: self.config.name.clone(),
            token: self.policy().token.clone(),
            amount: verified.reward,
        };

        // A duplicate that raced past the replay stage fails here.
        if let Err(err) = self
            .ledger
            .accept_claim(proof, &verified.supporter_id, &deposit)
        {
            warn!(
                claim_id = %proof.claim_id(),
                supporter = %proof.supporter(),
                error = %err,
                "claim rejected by ledger"
            );
            return Err(err.into());
        }

        info!(
            claim_id = %proof.claim_id(),
            supporter = %verified.supporter_name,
            hours = proof.hours(),
            reward = verified.reward,
            "claim accepted"
        );
        Ok(verified.reward)
    }

    /// Run the verifier without accepting, keeping the per-stage trail.
    pub fn evaluate(&self, proof: &Proof) -> VerificationReport {
        self.verifier.evaluate(proof, &self.ledger, Utc::now())
    }

    pub fn wallet_state(&self, owner: &str) -> IdentityResult<WalletState> {
        Ok(self.ledger.wallet_state(owner)?)
    }

    /// This identity's own wallet.
    pub fn wallet(&self) -> IdentityResult<WalletState> {
        self.wallet_state(&self.config.name)
    }

    pub fn transactions(&self, owner: &str) -> IdentityResult<Vec<Transaction>> {
        Ok(self.ledger.transactions(owner)?)
    }

    pub fn claim(&self, claim_id: &str) -> IdentityResult<Option<ClaimRecord>> {
        Ok(self.ledger.claim(claim_id)?)
    }

    pub fn supporters(&self) -> IdentityResult<Vec<SupporterRecord>> {
        Ok(self.ledger.supporters()?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::IdentityError;
    use crate::supporter::SupporterKeys;
    use mana_crypto::SigningKey;
    use mana_ledger::{InMemoryLedger, LedgerError, LedgerReader};
    use mana_pow::ClaimRequest;

    fn memory_identity() -> Identity<InMemoryLedger> {
        Identity::with_ledger(IdentityConfig::default(), InMemoryLedger::new()).unwrap()
    }

    fn grove() -> SupporterKeys {
        SupporterKeys::from_signing_key("Grove", SigningKey::from_bytes([5u8; 32]))
    }

    fn registered(identity: &Identity<impl Ledger>) -> SupporterKeys {
        let keys = grove();
        identity
            .register_supporter(keys.name(), &keys.public_key_hex())
            .unwrap();
        keys
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn construction_creates_empty_wallet() {
        let identity = memory_identity();
        let wallet = identity.wallet().unwrap();
        assert_eq!(wallet.owner, "Astra");
        assert_eq!(wallet.token, "ManaToken");
        assert_eq!(wallet.balance, 0);
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let config = IdentityConfig {
            max_hours_per_claim: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            Identity::with_ledger(config, InMemoryLedger::new()),
            Err(IdentityError::Config(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    #[test]
    fn register_normalizes_key_case() {
        let identity = memory_identity();
        let keys = grove();
        identity
            .register_supporter("Grove", &keys.public_key_hex().to_uppercase())
            .unwrap();
        let stored = identity.ledger().get_supporter_by_name("Grove").unwrap().unwrap();
        assert_eq!(stored.public_key_hex, keys.public_key_hex());
    }

    #[test]
    fn register_rejects_bad_key() {
        let identity = memory_identity();
        assert!(matches!(
            identity.register_supporter("Grove", "abcd"),
            Err(IdentityError::InvalidKey(_))
        ));
        assert!(identity.supporters().unwrap().is_empty());
    }

    #[test]
    fn register_rejects_duplicate_key_and_name() {
        let identity = memory_identity();
        let keys = registered(&identity);
        assert!(matches!(
            identity.register_supporter("Other", &keys.public_key_hex()),
            Err(IdentityError::Ledger(LedgerError::DuplicateKey(_)))
        ));
        let other = SupporterKeys::generate("Grove");
        assert!(matches!(
            identity.register_supporter("Grove", &other.public_key_hex()),
            Err(IdentityError::Ledger(LedgerError::DuplicateName(_)))
        ));
    }

    // -----------------------------------------------------------------------
    // End-to-end scenarios
    // -----------------------------------------------------------------------

    #[test]
    fn patrol_for_two_hours_earns_twenty() {
        let identity = memory_identity();
        let keys = registered(&identity);
        let proof = keys.create_proof(ClaimRequest::new("patrol", 2.0)).unwrap();

        assert_eq!(identity.verify_and_accept(&proof).unwrap(), 20);
        assert_eq!(identity.wallet().unwrap().balance, 20);

        let record = identity.claim(proof.claim_id()).unwrap().unwrap();
        assert_eq!(record.proof, proof);
        let txs = identity.transactions("Astra").unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, 20);
        assert_eq!(txs[0].related_claim_id.as_deref(), Some(proof.claim_id()));
    }

    #[test]
    fn resubmission_is_replay_and_balance_unchanged() {
        let identity = memory_identity();
        let keys = registered(&identity);
        let proof = keys.create_proof(ClaimRequest::new("patrol", 2.0)).unwrap();

        identity.verify_and_accept(&proof).unwrap();
        let err = identity.verify_and_accept(&proof).unwrap_err();
        assert!(matches!(err, VerificationError::ReplayRejected(_)));
        assert_eq!(identity.wallet().unwrap().balance, 20);
        assert_eq!(identity.transactions("Astra").unwrap().len(), 1);
    }

    #[test]
    fn hundred_hours_violate_policy_without_mutation() {
        let identity = memory_identity();
        let keys = registered(&identity);
        let mut proof = keys.create_proof(ClaimRequest::new("patrol", 0.5)).unwrap();
        proof.payload.hours = 100.0;

        let err = identity.verify_and_accept(&proof).unwrap_err();
        assert!(matches!(err, VerificationError::PolicyViolation(_)));
        assert!(!identity.ledger().has_claim(proof.claim_id()).unwrap());
        assert_eq!(identity.ledger().claim_count().unwrap(), 0);
        assert_eq!(identity.wallet().unwrap().balance, 0);
        assert!(identity.transactions("Astra").unwrap().is_empty());
    }

    #[test]
    fn quarter_hour_rounds_up() {
        let identity = memory_identity();
        let keys = registered(&identity);
        let proof = keys.create_proof(ClaimRequest::new("watering", 0.25)).unwrap();
        assert_eq!(identity.verify_and_accept(&proof).unwrap(), 3);
    }

    #[test]
    fn full_precision_hours_survive_the_proof_file() {
        let identity = memory_identity();
        let keys = registered(&identity);
        let mut expected = 0;
        for hours in [0.30000000000000004, 2.718281828459045, 1.2345678901234567] {
            let proof = keys.create_proof(ClaimRequest::new("patrol", hours)).unwrap();
            let parsed = Proof::from_json(&proof.to_json_pretty().unwrap()).unwrap();
            assert_eq!(parsed, proof);
            expected += identity.policy().reward_for(hours);
            identity.verify_and_accept(&parsed).unwrap();
        }
        assert_eq!(identity.wallet().unwrap().balance, expected);
    }

    #[test]
    fn rewards_accumulate() {
        let identity = memory_identity();
        let keys = registered(&identity);
        for hours in [0.5, 1.0, 2.0] {
            let proof = keys.create_proof(ClaimRequest::new("patrol", hours)).unwrap();
            identity.verify_and_accept(&proof).unwrap();
        }
        assert_eq!(identity.wallet().unwrap().balance, 35);
        assert_eq!(identity.transactions("Astra").unwrap().len(), 3);
    }

    #[test]
    fn unregistered_supporter_is_rejected() {
        let identity = memory_identity();
        let stranger = SupporterKeys::generate("Stranger");
        let proof = stranger.create_proof(ClaimRequest::new("patrol", 0.5)).unwrap();
        assert_eq!(
            identity.verify_and_accept(&proof).unwrap_err(),
            VerificationError::UnknownSupporter("Stranger".into())
        );
    }

    #[test]
    fn evaluate_does_not_accept() {
        let identity = memory_identity();
        let keys = registered(&identity);
        let proof = keys.create_proof(ClaimRequest::new("patrol", 0.5)).unwrap();
        assert!(identity.evaluate(&proof).is_accepted());
        assert_eq!(identity.wallet().unwrap().balance, 0);
        assert_eq!(identity.verify_and_accept(&proof).unwrap(), 5);
    }

    #[test]
    fn configured_rate_and_token_apply() {
        let config = IdentityConfig {
            name: "Willow".into(),
            token: "Sap".into(),
            tokens_per_hour: 4,
            ..Default::default()
        };
        let identity = Identity::with_ledger(config, InMemoryLedger::new()).unwrap();
        let keys = registered(&identity);
        let proof = keys.create_proof(ClaimRequest::new("patrol", 1.0)).unwrap();
        assert_eq!(identity.verify_and_accept(&proof).unwrap(), 4);
        let wallet = identity.wallet_state("Willow").unwrap();
        assert_eq!(wallet.token, "Sap");
        assert_eq!(wallet.balance, 4);
    }

    // -----------------------------------------------------------------------
    // Concurrency and durability
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_duplicates_credit_once() {
        let identity = Arc::new(memory_identity());
        let keys = registered(&*identity);
        let proof = keys.create_proof(ClaimRequest::new("patrol", 2.0)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let identity = Arc::clone(&identity);
                let proof = proof.clone();
                std::thread::spawn(move || identity.verify_and_accept(&proof))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, VerificationError::ReplayRejected(_))));
        assert_eq!(identity.wallet().unwrap().balance, 20);
    }

    #[test]
    fn sqlite_identity_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = IdentityConfig {
            db_path: dir.path().join("astra_ledger.db"),
            ..Default::default()
        };
        let proof = {
            let identity = Identity::open(config.clone()).unwrap();
            let keys = registered(&identity);
            let proof = keys.create_proof(ClaimRequest::new("patrol", 2.0)).unwrap();
            assert_eq!(identity.verify_and_accept(&proof).unwrap(), 20);
            proof
        };

        let identity = Identity::open(config).unwrap();
        assert_eq!(identity.wallet().unwrap().balance, 20);
        assert_eq!(identity.supporters().unwrap().len(), 1);
        assert!(matches!(
            identity.verify_and_accept(&proof),
            Err(VerificationError::ReplayRejected(_))
        ));
        assert_eq!(identity.wallet().unwrap().balance, 20);
    }

    #[test]
    fn sqlite_concurrent_duplicates_credit_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = IdentityConfig {
            db_path: dir.path().join("astra_ledger.db"),
            ..Default::default()
        };
        let identity = Arc::new(Identity::open(config).unwrap());
        let keys = registered(&*identity);
        let proof = keys.create_proof(ClaimRequest::new("patrol", 0.5)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let identity = Arc::clone(&identity);
                let proof = proof.clone();
                std::thread::spawn(move || identity.verify_and_accept(&proof))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(identity.wallet().unwrap().balance, 5);
    }
}

use mana_crypto::{SigningKey, VerifyingKey};
use mana_pow::{mine_proof, CancelToken, ClaimRequest, MineError, ProofMiner};
use mana_types::Proof;

/// A supporter's name and keypair, ready to mine proofs.
///
/// The public key is always derived from the private key at construction.
pub struct SupporterKeys {
    name: String,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl SupporterKeys {
    /// A fresh random keypair.
    pub fn generate(name: impl Into<String>) -> Self {
        Self::from_signing_key(name, SigningKey::generate())
    }

    pub fn from_signing_key(name: impl Into<String>, signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            name: name.into(),
            signing_key,
            verifying_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Lowercase hex of the raw public key, as registered with an identity.
    pub fn public_key_hex(&self) -> String {
        self.verifying_key.to_hex()
    }

    /// A miner bound to these keys.
    pub fn miner(&self) -> ProofMiner<'_> {
        ProofMiner::new(&self.signing_key, self.name.clone())
    }

    /// Mine a proof for `request`. Runs until it succeeds.
    pub fn create_proof(&self, request: ClaimRequest) -> Result<Proof, MineError> {
        self.create_proof_with_cancel(request, &CancelToken::new())
    }

    /// Mine a proof for `request`, stopping early if `cancel` is tripped.
    pub fn create_proof_with_cancel(
        &self,
        request: ClaimRequest,
        cancel: &CancelToken,
    ) -> Result<Proof, MineError> {
        mine_proof(&self.signing_key, &self.name, request, cancel)
    }
}

impl std::fmt::Debug for SupporterKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupporterKeys")
            .field("name", &self.name)
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mana_pow::required_zero_prefix;

    #[test]
    fn public_key_is_derived_from_private() {
        let keys = SupporterKeys::from_signing_key("Grove", SigningKey::from_bytes([3u8; 32]));
        assert_eq!(
            keys.public_key_hex(),
            SigningKey::from_bytes([3u8; 32]).verifying_key().to_hex()
        );
        assert_eq!(keys.name(), "Grove");
    }

    #[test]
    fn generated_keys_differ() {
        let a = SupporterKeys::generate("A");
        let b = SupporterKeys::generate("B");
        assert_ne!(a.public_key_hex(), b.public_key_hex());
    }

    #[test]
    fn create_proof_meets_difficulty() {
        let keys = SupporterKeys::generate("Grove");
        let proof = keys
            .create_proof(ClaimRequest::new("patrol", 2.0).with_evidence("ipfs://x", "beef"))
            .unwrap();
        assert_eq!(proof.supporter(), "Grove");
        assert_eq!(proof.payload.evidence_uri, "ipfs://x");
        assert!(proof.pow_hash.starts_with(&"0".repeat(required_zero_prefix(2.0) as usize)));
    }

    #[test]
    fn cancelled_proof_reports_cancellation() {
        let keys = SupporterKeys::generate("Grove");
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = keys
            .create_proof_with_cancel(ClaimRequest::new("patrol", 10.0), &cancel)
            .unwrap_err();
        assert!(matches!(err, MineError::Cancelled { .. }));
    }

    #[test]
    fn debug_hides_private_key() {
        let keys = SupporterKeys::from_signing_key("Grove", SigningKey::from_bytes([3u8; 32]));
        let shown = format!("{keys:?}");
        assert!(shown.contains("Grove"));
        assert!(!shown.contains(&hex_of(keys.signing_key().as_bytes())));
    }

    fn hex_of(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

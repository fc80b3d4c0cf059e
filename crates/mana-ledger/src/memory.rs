use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use mana_types::{
    ClaimRecord, Proof, SupporterId, SupporterRecord, Transaction, WalletState,
};

use crate::error::{LedgerError, ReplayField};
use crate::traits::{normalize_public_key, Deposit, LedgerReader, LedgerWriter};

/// In-memory ledger for tests, local demos, and embedding.
///
/// All mutations happen under one write lock, so each trait method is atomic
/// with respect to every other.
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    supporters: Vec<SupporterRecord>,
    claims: HashMap<String, ClaimRecord>,
    pow_hashes: HashMap<String, String>,
    wallets: HashMap<String, WalletState>,
    transactions: Vec<Transaction>,
}

impl LedgerState {
    fn check_replay(&self, proof: &Proof) -> Result<(), LedgerError> {
        if self.claims.contains_key(proof.claim_id()) {
            return Err(LedgerError::ReplayRejected {
                field: ReplayField::ClaimId,
                value: proof.claim_id().to_string(),
            });
        }
        if self.pow_hashes.contains_key(&proof.pow_hash) {
            return Err(LedgerError::ReplayRejected {
                field: ReplayField::PowHash,
                value: proof.pow_hash.clone(),
            });
        }
        Ok(())
    }

    fn check_supporter(&self, supporter_id: &SupporterId) -> Result<(), LedgerError> {
        if self.supporters.iter().any(|s| s.id == *supporter_id) {
            Ok(())
        } else {
            Err(LedgerError::UnknownSupporter(supporter_id.to_string()))
        }
    }

    /// Compute the post-deposit wallet without mutating anything.
    fn credited_wallet(&self, deposit: &Deposit) -> Result<WalletState, LedgerError> {
        let mut wallet = match self.wallets.get(&deposit.owner) {
            Some(w) => w.clone(),
            None => WalletState {
                owner: deposit.owner.clone(),
                token: deposit.token.clone(),
                balance: 0,
            },
        };
        if wallet.token != deposit.token {
            return Err(LedgerError::TokenMismatch {
                owner: deposit.owner.clone(),
                wallet_token: wallet.token,
                requested: deposit.token.clone(),
            });
        }
        wallet.balance = wallet
            .balance
            .checked_add(deposit.amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(deposit.owner.clone()))?;
        Ok(wallet)
    }

    fn insert_claim(&mut self, record: ClaimRecord) {
        self.pow_hashes
            .insert(record.proof.pow_hash.clone(), record.proof.claim_id().to_string());
        self.claims.insert(record.proof.claim_id().to_string(), record);
    }

    fn apply_deposit(
        &mut self,
        wallet: WalletState,
        deposit: &Deposit,
        related_claim_id: Option<&str>,
    ) -> Transaction {
        let tx = Transaction::deposit(
            &deposit.owner,
            &deposit.token,
            deposit.amount,
            related_claim_id.map(str::to_string),
        );
        self.wallets.insert(deposit.owner.clone(), wallet);
        self.transactions.push(tx.clone());
        tx
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Storage("ledger read lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Storage("ledger write lock poisoned".into()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerReader for InMemoryLedger {
    fn get_supporter_by_name(&self, name: &str) -> Result<Option<SupporterRecord>, LedgerError> {
        let state = self.read()?;
        Ok(state.supporters.iter().find(|s| s.name == name).cloned())
    }

    fn supporters(&self) -> Result<Vec<SupporterRecord>, LedgerError> {
        Ok(self.read()?.supporters.clone())
    }

    fn has_claim(&self, claim_id: &str) -> Result<bool, LedgerError> {
        Ok(self.read()?.claims.contains_key(claim_id))
    }

    fn has_pow_hash(&self, pow_hash: &str) -> Result<bool, LedgerError> {
        Ok(self.read()?.pow_hashes.contains_key(pow_hash))
    }

    fn claim(&self, claim_id: &str) -> Result<Option<ClaimRecord>, LedgerError> {
        Ok(self.read()?.claims.get(claim_id).cloned())
    }

    fn claim_count(&self) -> Result<u64, LedgerError> {
        Ok(self.read()?.claims.len() as u64)
    }

    fn wallet_state(&self, owner: &str) -> Result<WalletState, LedgerError> {
        let state = self.read()?;
        Ok(state
            .wallets
            .get(owner)
            .cloned()
            .unwrap_or_else(|| WalletState::empty(owner)))
    }

    fn transactions(&self, owner: &str) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.read()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect())
    }
}

impl LedgerWriter for InMemoryLedger {
    fn add_supporter(&self, name: &str, public_key_hex: &str) -> Result<SupporterId, LedgerError> {
        let public_key_hex = normalize_public_key(public_key_hex);
        let public_key_hex = public_key_hex.as_str();
        let mut state = self.write()?;
        if state.supporters.iter().any(|s| s.public_key_hex == public_key_hex) {
            return Err(LedgerError::DuplicateKey(public_key_hex.to_string()));
        }
        if state.supporters.iter().any(|s| s.name == name) {
            return Err(LedgerError::DuplicateName(name.to_string()));
        }
        let record = SupporterRecord {
            id: SupporterId::new(),
            name: name.to_string(),
            public_key_hex: public_key_hex.to_string(),
            created_at: Utc::now(),
        };
        let id = record.id.clone();
        state.supporters.push(record);
        Ok(id)
    }

    fn ensure_wallet(&self, owner: &str, token: &str) -> Result<WalletState, LedgerError> {
        let mut state = self.write()?;
        let wallet = state
            .wallets
            .entry(owner.to_string())
            .or_insert_with(|| WalletState {
                owner: owner.to_string(),
                token: token.to_string(),
                balance: 0,
            });
        Ok(wallet.clone())
    }

    fn record_claim(
        &self,
        proof: &Proof,
        supporter_id: &SupporterId,
    ) -> Result<ClaimRecord, LedgerError> {
        let mut state = self.write()?;
        state.check_replay(proof)?;
        state.check_supporter(supporter_id)?;
        let record = ClaimRecord::accepted(proof.clone(), supporter_id.clone());
        state.insert_claim(record.clone());
        Ok(record)
    }

    fn deposit(
        &self,
        deposit: &Deposit,
        related_claim_id: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let mut state = self.write()?;
        let wallet = state.credited_wallet(deposit)?;
        Ok(state.apply_deposit(wallet, deposit, related_claim_id))
    }

    fn accept_claim(
        &self,
        proof: &Proof,
        supporter_id: &SupporterId,
        deposit: &Deposit,
    ) -> Result<(ClaimRecord, Transaction), LedgerError> {
        let mut state = self.write()?;
        // Validate everything before the first mutation.
        state.check_replay(proof)?;
        state.check_supporter(supporter_id)?;
        let wallet = state.credited_wallet(deposit)?;

        let record = ClaimRecord::accepted(proof.clone(), supporter_id.clone());
        state.insert_claim(record.clone());
        let tx = state.apply_deposit(wallet, deposit, Some(proof.claim_id()));
        Ok((record, tx))
    }
}

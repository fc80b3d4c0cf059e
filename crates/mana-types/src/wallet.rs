use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Token symbol credited when none is configured.
pub const DEFAULT_TOKEN: &str = "ManaToken";

/// Balance held by a single owner. One wallet per owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub owner: String,
    pub token: String,
    pub balance: u64,
}

impl WalletState {
    /// The state reported for an owner that has never been credited.
    pub fn empty(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            token: DEFAULT_TOKEN.into(),
            balance: 0,
        }
    }
}

/// Kind of a ledger transaction. Only deposits exist today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            other => Err(TypeError::Serialization(format!(
                "unknown transaction kind '{other}'"
            ))),
        }
    }
}

/// Immutable, append-only audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: uuid::Uuid,
    pub kind: TransactionKind,
    pub token: String,
    pub amount: u64,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
    /// Claim that produced this entry; a back-reference only.
    pub related_claim_id: Option<String>,
}

impl Transaction {
    pub fn deposit(
        owner: impl Into<String>,
        token: impl Into<String>,
        amount: u64,
        related_claim_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            kind: TransactionKind::Deposit,
            token: token.into(),
            amount,
            owner: owner.into(),
            timestamp: Utc::now(),
            related_claim_id,
        }
    }
}

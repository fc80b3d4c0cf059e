use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::Proof;
use crate::error::TypeError;
use crate::supporter::SupporterId;

/// Lifecycle status of a persisted claim.
///
/// Only accepted claims are ever written; a rejected submission leaves no
/// row behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Accepted,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            other => Err(TypeError::Serialization(format!("unknown claim status '{other}'"))),
        }
    }
}

/// An accepted claim as stored in the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub proof: Proof,
    /// Registered supporter the claim was verified against.
    pub supporter_id: SupporterId,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn accepted(proof: Proof, supporter_id: SupporterId) -> Self {
        Self {
            proof,
            supporter_id,
            status: ClaimStatus::Accepted,
            created_at: Utc::now(),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Names of the ten fields of the proof exchange record, in wire order.
pub const PROOF_FIELDS: [&str; 10] = [
    "claim_id",
    "supporter",
    "action",
    "hours",
    "timestamp",
    "evidence_uri",
    "evidence_hash",
    "nonce",
    "attestation",
    "pow_hash",
];

/// The signed content of a stewardship claim.
///
/// These eight fields, and nothing else, feed the canonical encoding that is
/// signed by the supporter and hashed for proof-of-work. `timestamp` is kept
/// as the exact string the signer produced so that re-encoding never drifts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimPayload {
    /// Client-generated, globally unique claim identifier.
    pub claim_id: String,
    /// Registered name of the supporter making the claim.
    pub supporter: String,
    /// Free-text description of the work performed.
    pub action: String,
    /// Hours claimed.
    pub hours: f64,
    /// RFC 3339 UTC instant at which the claim was made.
    pub timestamp: String,
    /// Optional pointer to external evidence (empty when absent).
    pub evidence_uri: String,
    /// Optional digest of the external evidence (empty when absent).
    pub evidence_hash: String,
    /// Proof-of-work nonce; only changes while mining.
    pub nonce: u64,
}

impl ClaimPayload {
    /// Parse the payload timestamp into UTC.
    pub fn timestamp_utc(&self) -> Result<chrono::DateTime<chrono::Utc>, TypeError> {
        crate::parse_timestamp(&self.timestamp)
    }
}

/// A mined claim as exchanged between supporter and identity.
///
/// On the wire this is a flat record with exactly the fields listed in
/// [`PROOF_FIELDS`]; missing, extra, or mistyped fields are rejected when
/// parsing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProofWire", into = "ProofWire")]
pub struct Proof {
    pub payload: ClaimPayload,
    /// Hex-encoded signature over the canonical payload bytes.
    pub attestation: String,
    /// Hex-encoded SHA-256 of canonical bytes followed by raw signature bytes.
    pub pow_hash: String,
}

impl Proof {
    /// Parse a proof from its JSON exchange form.
    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        serde_json::from_str(json).map_err(|e| TypeError::MalformedProof(e.to_string()))
    }

    /// Parse a proof from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TypeError> {
        serde_json::from_value(value).map_err(|e| TypeError::MalformedProof(e.to_string()))
    }

    /// Pretty-printed JSON exchange form.
    pub fn to_json_pretty(&self) -> Result<String, TypeError> {
        serde_json::to_string_pretty(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn claim_id(&self) -> &str {
        &self.payload.claim_id
    }

    pub fn supporter(&self) -> &str {
        &self.payload.supporter
    }

    pub fn hours(&self) -> f64 {
        self.payload.hours
    }

    /// Sealing fields left blank: a proof that was never signed or never
    /// mined.
    ///
    /// Payload text fields are free-form and may be empty; only
    /// `attestation` and `pow_hash` are reported.
    pub fn unsealed_fields(&self) -> Vec<&'static str> {
        [
            ("attestation", self.attestation.as_str()),
            ("pow_hash", self.pow_hash.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProofWire {
    claim_id: String,
    supporter: String,
    action: String,
    hours: f64,
    timestamp: String,
    evidence_uri: String,
    evidence_hash: String,
    nonce: u64,
    attestation: String,
    pow_hash: String,
}

impl From<ProofWire> for Proof {
    fn from(w: ProofWire) -> Self {
        Self {
            payload: ClaimPayload {
                claim_id: w.claim_id,
                supporter: w.supporter,
                action: w.action,
                hours: w.hours,
                timestamp: w.timestamp,
                evidence_uri: w.evidence_uri,
                evidence_hash: w.evidence_hash,
                nonce: w.nonce,
            },
            attestation: w.attestation,
            pow_hash: w.pow_hash,
        }
    }
}

impl From<Proof> for ProofWire {
    fn from(p: Proof) -> Self {
        let ClaimPayload {
            claim_id,
            supporter,
            action,
            hours,
            timestamp,
            evidence_uri,
            evidence_hash,
            nonce,
        } = p.payload;
        Self {
            claim_id,
            supporter,
            action,
            hours,
            timestamp,
            evidence_uri,
            evidence_hash,
            nonce,
            attestation: p.attestation,
            pow_hash: p.pow_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> serde_json::Value {
        json!({
            "claim_id": "6f1c0c1e-8d2b-4f7a-9b8e-2f0d3c4b5a69",
            "supporter": "Grove",
            "action": "patrol",
            "hours": 2.0,
            "timestamp": "2024-05-01T12:30:00.000000Z",
            "evidence_uri": "",
            "evidence_hash": "",
            "nonce": 17,
            "attestation": "ab",
            "pow_hash": "00cd"
        })
    }

    #[test]
    fn parses_flat_record() {
        let proof = Proof::from_value(sample_json()).unwrap();
        assert_eq!(proof.supporter(), "Grove");
        assert_eq!(proof.payload.nonce, 17);
        assert_eq!(proof.hours(), 2.0);
        assert_eq!(proof.pow_hash, "00cd");
    }

    #[test]
    fn serializes_back_to_flat_record() {
        let proof = Proof::from_value(sample_json()).unwrap();
        let value = serde_json::to_value(&proof).unwrap();
        assert_eq!(value, sample_json());
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), PROOF_FIELDS.len());
        for field in PROOF_FIELDS {
            assert!(obj.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn missing_field_is_malformed() {
        for field in PROOF_FIELDS {
            let mut value = sample_json();
            value.as_object_mut().unwrap().remove(field);
            let err = Proof::from_value(value).unwrap_err();
            match err {
                TypeError::MalformedProof(msg) => assert!(msg.contains(field), "{msg}"),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_field_is_malformed() {
        let mut value = sample_json();
        value["status"] = json!("accepted");
        assert!(matches!(
            Proof::from_value(value),
            Err(TypeError::MalformedProof(_))
        ));
    }

    #[test]
    fn mistyped_field_is_malformed() {
        let mut value = sample_json();
        value["hours"] = json!("two");
        assert!(Proof::from_value(value).is_err());

        let mut value = sample_json();
        value["nonce"] = json!(-1);
        assert!(Proof::from_value(value).is_err());
    }

    #[test]
    fn unsealed_fields_ignore_payload_text() {
        let mut proof = Proof::from_value(sample_json()).unwrap();
        assert!(proof.unsealed_fields().is_empty());
        proof.payload.action.clear();
        proof.payload.evidence_uri.clear();
        assert!(proof.unsealed_fields().is_empty());
        proof.attestation = "  ".into();
        proof.pow_hash.clear();
        assert_eq!(proof.unsealed_fields(), vec!["attestation", "pow_hash"]);
    }

    #[test]
    fn full_precision_hours_survive_json() {
        for hours in [15.298408623788905_f64, 986.6560022184365, 0.30000000000000004] {
            let mut value = sample_json();
            value["hours"] = json!(hours);
            let proof = Proof::from_value(value).unwrap();
            let text = proof.to_json_pretty().unwrap();
            let parsed = Proof::from_json(&text).unwrap();
            assert_eq!(parsed.hours().to_bits(), hours.to_bits(), "{hours} became {}", parsed.hours());
        }
    }

    #[test]
    fn payload_timestamp_parses() {
        let proof = Proof::from_value(sample_json()).unwrap();
        assert!(proof.payload.timestamp_utc().is_ok());
    }
}

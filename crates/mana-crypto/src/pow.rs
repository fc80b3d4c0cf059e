use sha2::{Digest, Sha256};

/// SHA-256 digest binding a canonical payload to its attestation.
///
/// `pow_hash = SHA256(canonical_bytes || raw_signature_bytes)`. Difficulty is
/// expressed as a count of leading `0` characters in the lowercase hex form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PowHash([u8; 32]);

impl PowHash {
    /// Hash canonical payload bytes followed by raw signature bytes.
    pub fn compute(canonical: &[u8], signature: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical);
        hasher.update(signature);
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding, as carried in the proof record.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of leading zero hex digits.
    pub fn leading_zero_digits(&self) -> u32 {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
            } else {
                if byte < 0x10 {
                    count += 1;
                }
                break;
            }
        }
        count
    }

    /// Whether the hash has at least `difficulty` leading zero hex digits.
    pub fn meets(&self, difficulty: u32) -> bool {
        self.leading_zero_digits() >= difficulty
    }
}

impl std::fmt::Debug for PowHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PowHash({})", self.to_hex())
    }
}

impl std::fmt::Display for PowHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Count leading `'0'` characters of a hex string as submitted by a client.
pub fn leading_zero_hex_digits(hex: &str) -> u32 {
    hex.bytes().take_while(|b| *b == b'0').count() as u32
}

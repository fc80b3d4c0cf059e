//! Cryptographic primitives for Astra Mana.
//!
//! Provides Ed25519 signing/verification, the canonical byte encoding of a
//! claim payload, and the SHA-256 proof-of-work hash that binds a payload to
//! its attestation.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod canonical;
pub mod pow;
pub mod signer;

pub use canonical::{canonicalize, parse_canonical, CodecError};
pub use pow::{leading_zero_hex_digits, PowHash};
pub use signer::{
    generate_keypair, public_from_hex, public_to_hex, sign, verify, Signature, SignatureError,
    SigningKey, VerifyingKey,
};

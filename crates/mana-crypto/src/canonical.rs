//! Canonical encoding of a claim payload.
//!
//! The canonical form is the wire contract every signer and verifier shares:
//! a JSON object holding exactly the eight payload fields with keys sorted
//! bytewise, `,` and `:` separators and no other whitespace, every character
//! outside printable ASCII escaped as `\uXXXX` (UTF-16 surrogate pairs above
//! the BMP), `hours` rendered as a float and `nonce` as an integer.
//!
//! Floats use the shortest digits that round-trip, laid out the way Python's
//! `repr` does: positional with at least one fractional digit (`2.0`,
//! `0.0001`) while the decimal exponent is in `-4..16`, scientific otherwise
//! with an explicit sign and at least two exponent digits (`1e-05`,
//! `1.5e+16`).
//!
//! Changing any byte of this encoding invalidates every existing attestation.

use std::collections::BTreeMap;
use std::io;

use mana_types::ClaimPayload;
use serde::Serialize;
use serde_json::Value;

/// Errors from canonical encoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("hours must be a finite number")]
    NonFiniteHours,
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encode a payload into its canonical bytes.
pub fn canonicalize(payload: &ClaimPayload) -> Result<Vec<u8>, CodecError> {
    if !payload.hours.is_finite() {
        return Err(CodecError::NonFiniteHours);
    }

    let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
    fields.insert("action", Value::from(payload.action.as_str()));
    fields.insert("claim_id", Value::from(payload.claim_id.as_str()));
    fields.insert("evidence_hash", Value::from(payload.evidence_hash.as_str()));
    fields.insert("evidence_uri", Value::from(payload.evidence_uri.as_str()));
    fields.insert("hours", Value::from(payload.hours));
    fields.insert("nonce", Value::from(payload.nonce));
    fields.insert("supporter", Value::from(payload.supporter.as_str()));
    fields.insert("timestamp", Value::from(payload.timestamp.as_str()));

    let mut out = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    fields
        .serialize(&mut ser)
        .map_err(|e| CodecError::Serialization(e.to_string()))?;
    Ok(out)
}

/// Decode canonical bytes back into a payload.
pub fn parse_canonical(bytes: &[u8]) -> Result<ClaimPayload, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Shortest round-trip rendering of a finite float in Python `repr` layout.
fn repr_f64(value: f64) -> String {
    // `{:e}` yields the shortest round-trip digits, e.g. `-1.5e-5`.
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };

    if !(-4..16).contains(&exponent) {
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exponent.unsigned_abs());
    }

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let point = exponent + 1;
    if point <= 0 {
        format!("{sign}0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else if point as usize >= digits.len() {
        format!("{sign}{digits}{}.0", "0".repeat(point as usize - digits.len()))
    } else {
        let (int, frac) = digits.split_at(point as usize);
        format!("{sign}{int}.{frac}")
    }
}

/// Compact formatter that escapes everything outside printable ASCII and
/// lays out floats like Python.
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(repr_f64(value).as_bytes())
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

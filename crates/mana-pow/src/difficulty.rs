/// Upper bounds (inclusive) on claimed hours and the difficulty they require.
pub const DIFFICULTY_TIERS: [(f64, u32); 3] = [(1.0, 1), (3.0, 2), (8.0, 3)];

/// Difficulty for anything above the last tier. A demo-scale cap, not an
/// anti-spam guarantee.
pub const MAX_DIFFICULTY: u32 = 4;

/// Required number of leading zero hex digits for a claim of `hours`.
///
/// Total over all `f64` values: non-positive hours map to the lowest tier and
/// NaN to the cap. Bounds checks on hours happen in the verifier.
pub fn required_zero_prefix(hours: f64) -> u32 {
    DIFFICULTY_TIERS
        .iter()
        .find(|(bound, _)| hours <= *bound)
        .map(|(_, difficulty)| *difficulty)
        .unwrap_or(MAX_DIFFICULTY)
}

/// Expected number of hash attempts to meet `difficulty` (16^difficulty).
pub fn expected_attempts(difficulty: u32) -> u64 {
    16u64.saturating_pow(difficulty)
}

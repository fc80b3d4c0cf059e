use serde::{Deserialize, Serialize};

use mana_types::DEFAULT_TOKEN;

/// Immutable policy an identity verifies and rewards claims under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimPolicy {
    /// Upper bound on hours in a single claim (inclusive).
    pub max_hours_per_claim: f64,
    /// Tokens credited per claimed hour.
    pub tokens_per_hour: u64,
    /// Token symbol credited.
    pub token: String,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            max_hours_per_claim: 24.0,
            tokens_per_hour: 10,
            token: DEFAULT_TOKEN.to_string(),
        }
    }
}

impl ClaimPolicy {
    pub fn new(max_hours_per_claim: f64, tokens_per_hour: u64, token: impl Into<String>) -> Self {
        Self {
            max_hours_per_claim,
            tokens_per_hour,
            token: token.into(),
        }
    }

    /// Whether `hours` lies in `(0, max_hours_per_claim]`.
    pub fn allows_hours(&self, hours: f64) -> bool {
        hours > 0.0 && hours <= self.max_hours_per_claim
    }

    /// Reward for `hours`, rounded half away from zero.
    ///
    /// `0.25 h * 10/h = 2.5` credits 3.
    pub fn reward_for(&self, hours: f64) -> u64 {
        // `as` saturates; NaN becomes 0.
        (hours * self.tokens_per_hour as f64).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = ClaimPolicy::default();
        assert_eq!(policy.max_hours_per_claim, 24.0);
        assert_eq!(policy.tokens_per_hour, 10);
        assert_eq!(policy.token, "ManaToken");
    }

    #[test]
    fn hour_bounds_are_half_open() {
        let policy = ClaimPolicy::default();
        assert!(!policy.allows_hours(0.0));
        assert!(!policy.allows_hours(-1.0));
        assert!(policy.allows_hours(0.01));
        assert!(policy.allows_hours(24.0));
        assert!(!policy.allows_hours(24.01));
        assert!(!policy.allows_hours(f64::NAN));
    }

    #[test]
    fn reward_rounds_half_up() {
        let policy = ClaimPolicy::default();
        assert_eq!(policy.reward_for(2.0), 20);
        assert_eq!(policy.reward_for(0.25), 3);
        assert_eq!(policy.reward_for(0.04), 0);
        assert_eq!(policy.reward_for(1.5), 15);

        let odd = ClaimPolicy::new(24.0, 3, "ManaToken");
        assert_eq!(odd.reward_for(0.5), 2);
        assert_eq!(odd.reward_for(2.5), 8);
    }
}

use std::path::{Path, PathBuf};

use mana_gate::ClaimPolicy;
use mana_types::DEFAULT_TOKEN;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};

/// File `init` writes the identity configuration to.
pub const CONFIG_FILE: &str = "astra.toml";

/// Configuration an [`Identity`](crate::Identity) is constructed with.
///
/// Missing keys take their defaults, so a partial file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Identity name; also the owner of the reward wallet.
    pub name: String,
    pub classification: String,
    pub purpose: String,
    /// Token symbol credited for accepted claims.
    pub token: String,
    pub tokens_per_hour: u64,
    pub max_hours_per_claim: f64,
    /// SQLite ledger location.
    pub db_path: PathBuf,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: "Astra".into(),
            classification: "Spirit of a Grave Tree".into(),
            purpose: "Realm Defender".into(),
            token: DEFAULT_TOKEN.into(),
            tokens_per_hour: 10,
            max_hours_per_claim: 24.0,
            db_path: PathBuf::from("astra_ledger.db"),
        }
    }
}

impl IdentityConfig {
    /// Parse and validate TOML.
    pub fn from_toml_str(s: &str) -> IdentityResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| IdentityError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> IdentityResult<String> {
        toml::to_string_pretty(self).map_err(|e| IdentityError::Config(e.to_string()))
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> IdentityResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> IdentityResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> IdentityResult<()> {
        if self.name.trim().is_empty() {
            return Err(IdentityError::Config("name must not be empty".into()));
        }
        if self.token.trim().is_empty() {
            return Err(IdentityError::Config("token must not be empty".into()));
        }
        if !self.max_hours_per_claim.is_finite() || self.max_hours_per_claim <= 0.0 {
            return Err(IdentityError::Config(format!(
                "max_hours_per_claim must be positive and finite, got {}",
                self.max_hours_per_claim
            )));
        }
        Ok(())
    }

    /// The immutable policy claims are verified and rewarded under.
    pub fn policy(&self) -> ClaimPolicy {
        ClaimPolicy::new(self.max_hours_per_claim, self.tokens_per_hour, &self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = IdentityConfig::default();
        assert_eq!(c.name, "Astra");
        assert_eq!(c.classification, "Spirit of a Grave Tree");
        assert_eq!(c.purpose, "Realm Defender");
        assert_eq!(c.token, "ManaToken");
        assert_eq!(c.tokens_per_hour, 10);
        assert_eq!(c.max_hours_per_claim, 24.0);
        assert_eq!(c.db_path, PathBuf::from("astra_ledger.db"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c = IdentityConfig::from_toml_str("name = \"Willow\"\ntokens_per_hour = 3\n").unwrap();
        assert_eq!(c.name, "Willow");
        assert_eq!(c.tokens_per_hour, 3);
        assert_eq!(c.token, "ManaToken");
    }

    #[test]
    fn toml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let c = IdentityConfig {
            max_hours_per_claim: 12.5,
            ..Default::default()
        };
        c.save(&path).unwrap();
        assert_eq!(IdentityConfig::load(&path).unwrap(), c);
    }

    #[test]
    fn rejects_bad_hour_limit() {
        let err = IdentityConfig::from_toml_str("max_hours_per_claim = 0.0").unwrap_err();
        assert!(matches!(err, IdentityError::Config(_)));
        let err = IdentityConfig::from_toml_str("max_hours_per_claim = -4.0").unwrap_err();
        assert!(matches!(err, IdentityError::Config(_)));
    }

    #[test]
    fn rejects_unparseable_toml() {
        assert!(matches!(
            IdentityConfig::from_toml_str("tokens_per_hour = \"ten\""),
            Err(IdentityError::Config(_))
        ));
    }

    #[test]
    fn policy_mirrors_config() {
        let c = IdentityConfig::default();
        assert_eq!(c.policy(), ClaimPolicy::default());
    }
}

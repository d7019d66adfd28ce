//! Reconciler configuration
//!
//! Configuration is layered: defaults, then an optional TOML or JSON file,
//! then `TRUSTBIND_*` environment variables. The result must pass
//! [`ReconcilerConfig::validate`] before a reconciler will accept it.

use crate::claims::ClaimSet;
use crate::errors::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "TRUSTBIND_";

/// Claim keys every desired claim set must declare, whatever the configuration
pub const BASE_REQUIRED_KEYS: [&str; 2] = ["aud", "sub"];

/// Lowest `min_keys` a configuration may set
pub const BASE_MIN_KEYS: usize = 2;

/// Rules every desired claim set must satisfy
///
/// The policy can only tighten the base rule: `aud` and `sub` are always
/// required and at least [`BASE_MIN_KEYS`] distinct keys must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimPolicy {
    /// Claim keys required on top of [`BASE_REQUIRED_KEYS`]
    pub extra_required_keys: Vec<String>,
    /// Minimum number of distinct claim keys
    pub min_keys: usize,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            extra_required_keys: Vec::new(),
            min_keys: BASE_MIN_KEYS,
        }
    }
}

impl ClaimPolicy {
    /// Every key a claim set must declare, base keys first
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        BASE_REQUIRED_KEYS
            .into_iter()
            .chain(self.extra_required_keys.iter().map(String::as_str))
    }

    /// Check a desired claim set against the policy
    pub fn check(&self, claims: &ClaimSet) -> Result<()> {
        let min_keys = self.min_keys.max(BASE_MIN_KEYS);
        if claims.len() < min_keys {
            return Err(ReconcileError::invalid_field(
                "config_oidc.claims",
                format!(
                    "at least {} claim keys are required, got {}",
                    min_keys,
                    claims.len()
                ),
            ));
        }

        for key in self.required_keys() {
            if !claims.contains_key(key) {
                return Err(ReconcileError::invalid_field(
                    format!("config_oidc.claims[{key}]"),
                    "required claim is missing",
                ));
            }
        }

        Ok(())
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Claim rules enforced on desired state
    pub claim_policy: ClaimPolicy,
    /// Leave `claims_type` off the wire when it is `exact`
    pub omit_default_claims_type: bool,
}

impl ReconcilerConfig {
    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReconcileError::config(format!("Failed to read config file: {e}")))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ReconcileError::config(format!("Invalid TOML: {e}"))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ReconcileError::config(format!("Invalid JSON: {e}"))),
            _ => Err(ReconcileError::config("Unsupported file format")),
        }
    }

    /// Overlay `TRUSTBIND_*` variables from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Overlay `TRUSTBIND_*` variables from an explicit source
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();

            match name {
                "MIN_CLAIM_KEYS" => {
                    self.claim_policy.min_keys = value.parse().map_err(|_| {
                        ReconcileError::config("Invalid number in TRUSTBIND_MIN_CLAIM_KEYS")
                    })?;
                }
                "EXTRA_REQUIRED_CLAIM_KEYS" => {
                    self.claim_policy.extra_required_keys = value
                        .split(',')
                        .map(str::trim)
                        .filter(|key| !key.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "OMIT_DEFAULT_CLAIMS_TYPE" => {
                    self.omit_default_claims_type = value.parse().map_err(|_| {
                        ReconcileError::config(
                            "Invalid boolean in TRUSTBIND_OMIT_DEFAULT_CLAIMS_TYPE",
                        )
                    })?;
                }
                other => {
                    tracing::debug!(variable = %other, "Ignoring unknown configuration variable");
                }
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.claim_policy.min_keys < BASE_MIN_KEYS {
            return Err(ReconcileError::config(format!(
                "min_keys must be at least {BASE_MIN_KEYS}, got {}",
                self.claim_policy.min_keys
            )));
        }
        if self
            .claim_policy
            .extra_required_keys
            .iter()
            .any(|key| key.trim().is_empty())
        {
            return Err(ReconcileError::config("required claim keys cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{to_canonical, ClaimRule};
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults_require_aud_and_sub() {
        let config = ReconcilerConfig::default();
        let policy = &config.claim_policy;
        assert_eq!(policy.required_keys().collect::<Vec<_>>(), vec!["aud", "sub"]);
        assert_eq!(policy.min_keys, 2);
        assert!(!config.omit_default_claims_type);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_rejects_missing_sub() {
        let claims = to_canonical(&[
            ClaimRule::new("aud", ["A"]),
            ClaimRule::new("repository", ["acme/x"]),
        ])
        .unwrap();

        let result = ClaimPolicy::default().check(&claims);
        assert_matches!(
            result,
            Err(ReconcileError::InvalidField { field, .. }) if field == "config_oidc.claims[sub]"
        );
    }

    #[test]
    fn test_policy_rejects_single_key() {
        let claims = to_canonical(&[ClaimRule::new("aud", ["A"])]).unwrap();

        let result = ClaimPolicy::default().check(&claims);
        assert_matches!(
            result,
            Err(ReconcileError::InvalidField { field, .. }) if field == "config_oidc.claims"
        );
    }

    #[test]
    fn test_weakened_policy_still_enforces_base_rule() {
        // A policy built by hand, bypassing validate
        let policy = ClaimPolicy {
            extra_required_keys: Vec::new(),
            min_keys: 0,
        };

        let only_aud = to_canonical(&[ClaimRule::new("aud", ["A"])]).unwrap();
        assert_matches!(
            policy.check(&only_aud),
            Err(ReconcileError::InvalidField { field, .. }) if field == "config_oidc.claims"
        );

        let no_sub = to_canonical(&[
            ClaimRule::new("aud", ["A"]),
            ClaimRule::new("repository", ["acme/x"]),
        ])
        .unwrap();
        assert_matches!(
            policy.check(&no_sub),
            Err(ReconcileError::InvalidField { field, .. }) if field == "config_oidc.claims[sub]"
        );
    }

    #[test]
    fn test_extra_required_keys_add_to_base() {
        let policy = ClaimPolicy {
            extra_required_keys: vec!["repository".to_string()],
            min_keys: 3,
        };
        let claims = to_canonical(&[
            ClaimRule::new("aud", ["A"]),
            ClaimRule::new("sub", ["S"]),
            ClaimRule::new("ref", ["main"]),
        ])
        .unwrap();

        assert_matches!(
            policy.check(&claims),
            Err(ReconcileError::InvalidField { field, .. })
                if field == "config_oidc.claims[repository]"
        );
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
omit_default_claims_type = true

[claim_policy]
extra_required_keys = ["repository"]
min_keys = 3
"#
        )
        .unwrap();

        let config = ReconcilerConfig::load_from_file(file.path()).unwrap();
        assert!(config.omit_default_claims_type);
        assert_eq!(config.claim_policy.min_keys, 3);
        assert_eq!(
            config.claim_policy.required_keys().collect::<Vec<_>>(),
            vec!["aud", "sub", "repository"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();

        let result = ReconcilerConfig::load_from_file(file.path());
        assert_matches!(result, Err(ReconcileError::Config { .. }));
    }

    #[test]
    fn test_merge_with_vars() {
        let mut config = ReconcilerConfig::default();
        config
            .merge_with_vars([
                ("TRUSTBIND_MIN_CLAIM_KEYS", "3"),
                ("TRUSTBIND_EXTRA_REQUIRED_CLAIM_KEYS", " repository, ,ref"),
                ("TRUSTBIND_OMIT_DEFAULT_CLAIMS_TYPE", "true"),
                ("HOME", "/root"),
            ])
            .unwrap();

        assert_eq!(config.claim_policy.min_keys, 3);
        assert_eq!(
            config.claim_policy.extra_required_keys,
            vec!["repository", "ref"]
        );
        assert!(config.omit_default_claims_type);
    }

    #[test]
    fn test_merge_with_vars_rejects_bad_number() {
        let mut config = ReconcilerConfig::default();
        let result = config.merge_with_vars([("TRUSTBIND_MIN_CLAIM_KEYS", "two")]);
        assert_matches!(result, Err(ReconcileError::Config { .. }));
    }

    #[test]
    fn test_claims_type_default_is_not_configurable() {
        let mut config = ReconcilerConfig::default();
        config
            .merge_with_vars([("TRUSTBIND_DEFAULT_CLAIMS_TYPE", "wildcard")])
            .unwrap();

        assert_eq!(config, ReconcilerConfig::default());
    }

    #[test]
    fn test_validate_rejects_min_keys_below_two() {
        for min_keys in [0, 1] {
            let mut config = ReconcilerConfig::default();
            config.claim_policy.min_keys = min_keys;
            assert_matches!(config.validate(), Err(ReconcileError::Config { .. }));
        }
    }

    #[test]
    fn test_validate_rejects_weakened_env() {
        let mut config = ReconcilerConfig::default();
        config
            .merge_with_vars([
                ("TRUSTBIND_MIN_CLAIM_KEYS", "1"),
                ("TRUSTBIND_EXTRA_REQUIRED_CLAIM_KEYS", ""),
            ])
            .unwrap();

        assert_matches!(config.validate(), Err(ReconcileError::Config { .. }));
    }
}

//! Claim rule canonicalization
//!
//! Claim rules arrive list-shaped from both the declarative front end and
//! the authority. Internally they are held as a mapping from claim key to a
//! set of allowed values so neither key order nor value order can affect
//! equality.

use crate::errors::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single list-shaped claim rule: one key and the values it accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRule {
    /// Claim name inside the OIDC token (`aud`, `sub`, ...)
    pub key: String,
    /// Values the claim may take
    pub values: Vec<String>,
}

impl ClaimRule {
    /// Create a claim rule from any iterable of values
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Canonical claim mapping: `key -> set<value>`
///
/// Equality is set equality at both levels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(BTreeMap<String, BTreeSet<String>>);

impl ClaimSet {
    /// Number of distinct claim keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no claim keys are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a claim key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Allowed values for a claim key
    pub fn values(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.0.get(key)
    }

    /// Iterate claim keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate `(key, values)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.0.iter().map(|(key, values)| (key.as_str(), values))
    }
}

/// Convert list-shaped claim rules into the canonical mapping
///
/// Repeated values under one key collapse silently. A repeated key or a
/// key with no values is rejected, naming the key.
pub fn to_canonical<'a, I>(rules: I) -> Result<ClaimSet>
where
    I: IntoIterator<Item = &'a ClaimRule>,
{
    let mut claims = BTreeMap::new();

    for rule in rules {
        if claims.contains_key(&rule.key) {
            return Err(ReconcileError::DuplicateClaimKey {
                key: rule.key.clone(),
            });
        }
        if rule.values.is_empty() {
            return Err(ReconcileError::EmptyValueSet {
                key: rule.key.clone(),
            });
        }

        let values: BTreeSet<String> = rule.values.iter().cloned().collect();
        claims.insert(rule.key.clone(), values);
    }

    Ok(ClaimSet(claims))
}

/// Convert the canonical mapping back into list-shaped claim rules
///
/// One rule per key. The order of the returned rules carries no meaning.
pub fn from_canonical(claims: &ClaimSet) -> Vec<ClaimRule> {
    claims
        .iter()
        .map(|(key, values)| ClaimRule {
            key: key.to_string(),
            values: values.iter().cloned().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn test_order_does_not_matter() {
        let a = to_canonical(&[
            ClaimRule::new("aud", ["A", "B"]),
            ClaimRule::new("sub", ["S"]),
        ])
        .unwrap();
        let b = to_canonical(&[
            ClaimRule::new("sub", ["S"]),
            ClaimRule::new("aud", ["B", "A"]),
        ])
        .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = to_canonical(&[ClaimRule::new("aud", ["A"]), ClaimRule::new("aud", ["B"])]);

        assert_matches!(result, Err(ReconcileError::DuplicateClaimKey { key }) if key == "aud");
    }

    #[test]
    fn test_empty_value_set_rejected() {
        let result = to_canonical(&[ClaimRule::new("aud", Vec::<String>::new())]);

        assert_matches!(result, Err(ReconcileError::EmptyValueSet { key }) if key == "aud");
    }

    #[test]
    fn test_repeated_values_collapse() {
        let claims = to_canonical(&[ClaimRule::new("sub", ["S", "S", "T"])]).unwrap();

        assert_eq!(claims.values("sub").map(BTreeSet::len), Some(2));
    }

    #[test]
    fn test_from_canonical_one_rule_per_key() {
        let claims = to_canonical(&[
            ClaimRule::new("aud", ["A"]),
            ClaimRule::new("sub", ["S1", "S2"]),
            ClaimRule::new("repository", ["x"]),
        ])
        .unwrap();

        let rules = from_canonical(&claims);
        assert_eq!(rules.len(), 3);
        assert_eq!(to_canonical(&rules).unwrap(), claims);
    }

    fn arb_rules() -> impl Strategy<Value = Vec<ClaimRule>> {
        prop::collection::btree_map(
            "[a-z]{1,8}",
            prop::collection::vec("[a-zA-Z0-9:/*.-]{1,12}", 1..5),
            0..6,
        )
        .prop_map(|map| {
            map.into_iter()
                .map(|(key, values)| ClaimRule { key, values })
                .collect()
        })
    }

    proptest! {
        /// Reversing both levels of the list never changes the canonical form
        #[test]
        fn canonical_form_ignores_order(rules in arb_rules()) {
            let forward = to_canonical(&rules).unwrap();

            let reversed: Vec<ClaimRule> = rules
                .iter()
                .rev()
                .map(|rule| ClaimRule {
                    key: rule.key.clone(),
                    values: rule.values.iter().rev().cloned().collect(),
                })
                .collect();

            prop_assert_eq!(forward, to_canonical(&reversed).unwrap());
        }

        /// Canonicalizing the reverse mapping reproduces the original mapping
        #[test]
        fn from_canonical_is_inverse(rules in arb_rules()) {
            let claims = to_canonical(&rules).unwrap();
            prop_assert_eq!(to_canonical(&from_canonical(&claims)).unwrap(), claims);
        }
    }
}

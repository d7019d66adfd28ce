//! Drift detection between desired and observed identities
//!
//! Only fields under declarative control are compared. `slug` and
//! `parent_slug` identify the object; they never count as drift.

use crate::types::{AuthMethod, IdentityConfig};
use std::fmt;

/// A declaratively controlled field whose desired and observed values differ
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriftField {
    Name,
    TtlSeconds,
    Method,
    DiscoveryUrl,
    ClaimsType,
    Claims,
}

impl fmt::Display for DriftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::TtlSeconds => "ttl_seconds",
            Self::Method => "method",
            Self::DiscoveryUrl => "config_oidc.discovery_url",
            Self::ClaimsType => "config_oidc.claims_type",
            Self::Claims => "config_oidc.claims",
        };
        f.write_str(name)
    }
}

/// List the fields on which two identities disagree
pub fn drift(a: &IdentityConfig, b: &IdentityConfig) -> Vec<DriftField> {
    let mut fields = Vec::new();

    if a.name != b.name {
        fields.push(DriftField::Name);
    }
    if a.ttl_seconds != b.ttl_seconds {
        fields.push(DriftField::TtlSeconds);
    }
    if a.method_kind() != b.method_kind() {
        fields.push(DriftField::Method);
        return fields;
    }

    match (&a.method, &b.method) {
        (AuthMethod::Oidc(a), AuthMethod::Oidc(b)) => {
            if a.discovery_url != b.discovery_url {
                fields.push(DriftField::DiscoveryUrl);
            }
            if a.claims_type != b.claims_type {
                fields.push(DriftField::ClaimsType);
            }
            // ClaimSet equality is set equality at both levels
            if a.claims != b.claims {
                fields.push(DriftField::Claims);
            }
        }
    }

    fields
}

/// Whether no update is needed to bring `b` in line with `a`
pub fn equivalent(a: &IdentityConfig, b: &IdentityConfig) -> bool {
    drift(a, b).is_empty()
}

/// What the front end has to do to reach the desired state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing is known remotely yet
    Create,
    /// The parent changed; the identity must be destroyed and recreated
    Replace,
    /// The identity can be updated in place
    Update {
        /// Fields that differ
        drift: Vec<DriftField>,
    },
    /// Desired and observed state already agree
    Noop,
}

/// Decide how to reconcile `desired` against the last observed state
pub fn plan(observed: Option<&IdentityConfig>, desired: &IdentityConfig) -> Plan {
    let Some(observed) = observed else {
        return Plan::Create;
    };

    if observed.parent_slug != desired.parent_slug {
        return Plan::Replace;
    }

    let drift = drift(desired, observed);
    if drift.is_empty() {
        Plan::Noop
    } else {
        Plan::Update { drift }
    }
}

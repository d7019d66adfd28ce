//! Canonical identity model
//!
//! [`IdentityConfig`] is the order-free representation that both desired
//! and observed state are converted into before they are compared or sent
//! to the authority.

use crate::claims::ClaimSet;
use crate::errors::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How claim values are matched against an incoming token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsType {
    /// Values must match exactly
    #[default]
    Exact,
    /// Wildcard characters in values are expanded during validation
    Wildcard,
}

impl ClaimsType {
    /// Wire and declarative spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Wildcard => "wildcard",
        }
    }
}

impl fmt::Display for ClaimsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimsType {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(Self::Exact),
            "wildcard" => Ok(Self::Wildcard),
            other => Err(ReconcileError::invalid_field(
                "claims_type",
                format!("expected \"exact\" or \"wildcard\", got {other:?}"),
            )),
        }
    }
}

/// Method discriminator, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// OpenID Connect federation
    Oidc,
}

impl MethodKind {
    /// Wire and declarative spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oidc => "oidc",
        }
    }

    /// Parse a method tag, returning `None` for variants this crate does not know
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "oidc" => Some(Self::Oidc),
            _ => None,
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OIDC method configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfig {
    /// OpenID discovery document URL
    pub discovery_url: String,
    /// Claim matching mode
    pub claims_type: ClaimsType,
    /// Canonical claim rules
    pub claims: ClaimSet,
}

/// Authentication method with its method-specific configuration
///
/// Exactly one variant is active, so switching methods can never leave a
/// previous variant's configuration attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// OpenID Connect federation
    Oidc(OidcConfig),
}

impl AuthMethod {
    /// Discriminator of the active variant
    pub fn kind(&self) -> MethodKind {
        match self {
            Self::Oidc(_) => MethodKind::Oidc,
        }
    }
}

/// A service account identity, in canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Authority-assigned identifier; `None` before creation
    pub slug: Option<String>,
    /// Owning service account; changing it forces replacement
    pub parent_slug: String,
    /// Display name
    pub name: String,
    /// Lifetime of tokens issued for this identity
    pub ttl_seconds: u64,
    /// Active method and its configuration
    pub method: AuthMethod,
}

impl IdentityConfig {
    /// Discriminator of the active method
    pub fn method_kind(&self) -> MethodKind {
        self.method.kind()
    }

    /// OIDC configuration, when that is the active method
    pub fn oidc(&self) -> Option<&OidcConfig> {
        match &self.method {
            AuthMethod::Oidc(config) => Some(config),
        }
    }
}

//! Declarative boundary
//!
//! These are the shapes exchanged with the configuration front end: the
//! desired state it hands in and the observed state handed back. Collections
//! are list-shaped here; their order is never meaningful.

use crate::claims::ClaimRule;
use serde::{Deserialize, Serialize};

/// OIDC block as declared by the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredOidcConfig {
    /// Public URL of the OpenID discovery service
    pub discovery_url: String,
    /// `"exact"` or `"wildcard"`; absent means the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_type: Option<String>,
    /// Claim rules; at least the required keys must be present
    pub claims: Vec<ClaimRule>,
}

/// A service account identity as declared by, or reported to, the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredIdentity {
    /// Authority-assigned identifier, known once the identity exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Owning service account
    pub service_account_slug: String,
    /// Display name
    pub name: String,
    /// Token lifetime, in seconds
    pub ttl_seconds: i64,
    /// Method tag; inferred from the config block when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// OIDC configuration; exactly one block is expected
    #[serde(default)]
    pub config_oidc: Vec<DeclaredOidcConfig>,
}

/// The durable handle the front end persists between reconciliations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityHandle {
    /// Slug of the identity, or `None` when it should be (re)created
    pub slug: Option<String>,
}

impl IdentityHandle {
    /// Handle for an existing identity
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
        }
    }

    /// Forget the identity so the next reconciliation creates it again
    pub fn clear(&mut self) {
        self.slug = None;
    }

    /// Whether the handle points at an identity
    pub fn is_set(&self) -> bool {
        self.slug.is_some()
    }
}

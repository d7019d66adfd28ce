//! Wire payloads exchanged with the authority

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// A claim rule on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireClaim {
    pub key: String,
    pub values: Vec<String>,
}

/// `config_oidc` block on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOidcConfig {
    pub discovery_url: String,
    /// Omitted means `exact`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_type: Option<String>,
    #[serde(default)]
    pub claims: Vec<WireClaim>,
}

/// Body of a create or update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRequest {
    /// Present on update only; the authority assigns it on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub name: String,
    pub ttl_seconds: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_oidc: Option<WireOidcConfig>,
}

/// An identity as returned by the authority
///
/// The parent service account is not echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntity {
    pub slug: String,
    pub name: String,
    pub ttl_seconds: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_oidc: Option<WireOidcConfig>,
}

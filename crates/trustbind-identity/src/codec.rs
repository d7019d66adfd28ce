//! Desired/observed state codec
//!
//! Four pure conversions, none of which touch the network:
//!
//! - [`from_declared`]: front-end desired state into the canonical model,
//!   validating every identity invariant on the way in
//! - [`encode`]: canonical model into a create or update request body
//! - [`decode`]: authority response into the canonical model
//! - [`to_declared`]: canonical model back into the front-end shape
//!
//! Claim ordering is dropped at ingress and never reintroduced, so
//! `decode(encode(x))` is equivalent to `x` for every valid `x`.

use crate::claims::{from_canonical, to_canonical, ClaimRule};
use crate::config::ReconcilerConfig;
use crate::declarative::{DeclaredIdentity, DeclaredOidcConfig};
use crate::errors::{ReconcileError, Result};
use crate::types::{AuthMethod, ClaimsType, IdentityConfig, MethodKind, OidcConfig};
use crate::wire::{WireClaim, WireEntity, WireOidcConfig, WireRequest};

/// Which request body is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// The authority assigns the slug; none is sent
    Create,
    /// The slug identifies the identity to modify and must be sent
    Update,
}

/// Convert front-end desired state into the canonical model
pub fn from_declared(
    declared: &DeclaredIdentity,
    config: &ReconcilerConfig,
) -> Result<IdentityConfig> {
    if declared.service_account_slug.trim().is_empty() {
        return Err(ReconcileError::invalid_field(
            "service_account_slug",
            "must not be empty",
        ));
    }
    if declared.name.trim().is_empty() {
        return Err(ReconcileError::invalid_field("name", "must not be empty"));
    }
    let ttl_seconds = u64::try_from(declared.ttl_seconds).map_err(|_| {
        ReconcileError::invalid_field(
            "ttl_seconds",
            format!("must not be negative, got {}", declared.ttl_seconds),
        )
    })?;

    let kind = match declared.method.as_deref() {
        Some(tag) => MethodKind::parse(tag).ok_or_else(|| ReconcileError::UnsupportedMethod {
            method: tag.to_string(),
        })?,
        None if !declared.config_oidc.is_empty() => MethodKind::Oidc,
        None => {
            return Err(ReconcileError::invalid_field(
                "config_oidc",
                "a method configuration block is required",
            ))
        }
    };

    let method = match kind {
        MethodKind::Oidc => AuthMethod::Oidc(oidc_from_declared(&declared.config_oidc, config)?),
    };

    Ok(IdentityConfig {
        slug: declared.slug.clone(),
        parent_slug: declared.service_account_slug.clone(),
        name: declared.name.clone(),
        ttl_seconds,
        method,
    })
}

fn oidc_from_declared(
    blocks: &[DeclaredOidcConfig],
    config: &ReconcilerConfig,
) -> Result<OidcConfig> {
    let block = match blocks {
        [block] => block,
        _ => {
            return Err(ReconcileError::invalid_field(
                "config_oidc",
                format!("exactly one block is required, got {}", blocks.len()),
            ))
        }
    };

    if block.discovery_url.trim().is_empty() {
        return Err(ReconcileError::invalid_field(
            "config_oidc.discovery_url",
            "must not be empty",
        ));
    }

    let claims_type = match block.claims_type.as_deref() {
        Some(raw) => raw.parse::<ClaimsType>().map_err(|_| {
            ReconcileError::invalid_field(
                "config_oidc.claims_type",
                format!("expected \"exact\" or \"wildcard\", got {raw:?}"),
            )
        })?,
        None => {
            let claims_type = ClaimsType::default();
            tracing::debug!(%claims_type, "Applying default claims type");
            claims_type
        }
    };

    let claims = to_canonical(&block.claims)?;
    config.claim_policy.check(&claims)?;

    Ok(OidcConfig {
        discovery_url: block.discovery_url.clone(),
        claims_type,
        claims,
    })
}

/// Build the request body for a create or update call
pub fn encode(
    desired: &IdentityConfig,
    kind: RequestKind,
    config: &ReconcilerConfig,
) -> Result<WireRequest> {
    let slug = match kind {
        RequestKind::Create => None,
        RequestKind::Update => match desired.slug.as_deref() {
            Some(slug) if !slug.is_empty() => Some(slug.to_string()),
            _ => {
                return Err(ReconcileError::invalid_field(
                    "slug",
                    "an existing slug is required to update an identity",
                ))
            }
        },
    };

    let config_oidc = match &desired.method {
        AuthMethod::Oidc(oidc) => {
            let claims_type = if config.omit_default_claims_type
                && oidc.claims_type == ClaimsType::Exact
            {
                None
            } else {
                Some(oidc.claims_type.as_str().to_string())
            };

            Some(WireOidcConfig {
                discovery_url: oidc.discovery_url.clone(),
                claims_type,
                claims: from_canonical(&oidc.claims)
                    .into_iter()
                    .map(|rule| WireClaim {
                        key: rule.key,
                        values: rule.values,
                    })
                    .collect(),
            })
        }
    };

    Ok(WireRequest {
        slug,
        name: desired.name.clone(),
        ttl_seconds: desired.ttl_seconds,
        method: desired.method_kind().as_str().to_string(),
        config_oidc,
    })
}

/// Map an authority response onto the canonical model
///
/// The authority does not echo the parent, so the caller supplies it. A
/// method this crate does not know is a hard failure: the observed state
/// could not be represented faithfully.
pub fn decode(entity: &WireEntity, parent_slug: &str) -> Result<IdentityConfig> {
    let kind =
        MethodKind::parse(&entity.method).ok_or_else(|| ReconcileError::UnknownAuthMethod {
            method: entity.method.clone(),
        })?;

    if entity.slug.is_empty() {
        return Err(ReconcileError::malformed("slug", "authority returned an empty slug"));
    }
    if i64::try_from(entity.ttl_seconds).is_err() {
        return Err(ReconcileError::malformed(
            "ttl_seconds",
            format!("{} is out of range", entity.ttl_seconds),
        ));
    }

    let method = match kind {
        MethodKind::Oidc => {
            let wire = entity.config_oidc.as_ref().ok_or_else(|| {
                ReconcileError::malformed("config_oidc", "missing for method \"oidc\"")
            })?;
            AuthMethod::Oidc(oidc_from_wire(wire)?)
        }
    };

    Ok(IdentityConfig {
        slug: Some(entity.slug.clone()),
        parent_slug: parent_slug.to_string(),
        name: entity.name.clone(),
        ttl_seconds: entity.ttl_seconds,
        method,
    })
}

fn oidc_from_wire(wire: &WireOidcConfig) -> Result<OidcConfig> {
    // Omitted on the wire means exact, independent of local defaults.
    let claims_type = match wire.claims_type.as_deref() {
        Some(raw) => raw.parse::<ClaimsType>().map_err(|_| {
            ReconcileError::malformed(
                "config_oidc.claims_type",
                format!("unrecognized value {raw:?}"),
            )
        })?,
        None => ClaimsType::Exact,
    };

    let rules: Vec<ClaimRule> = wire
        .claims
        .iter()
        .map(|claim| ClaimRule {
            key: claim.key.clone(),
            values: claim.values.clone(),
        })
        .collect();

    Ok(OidcConfig {
        discovery_url: wire.discovery_url.clone(),
        claims_type,
        claims: to_canonical(&rules)?,
    })
}

/// Convert the canonical model back into the front-end shape
///
/// Front ends hold `ttl_seconds` as `i64`. A TTL above `i64::MAX` is
/// `InvalidField` rather than clamped; [`decode`] never produces one.
pub fn to_declared(identity: &IdentityConfig) -> Result<DeclaredIdentity> {
    let ttl_seconds = i64::try_from(identity.ttl_seconds).map_err(|_| {
        ReconcileError::invalid_field(
            "ttl_seconds",
            format!("{} does not fit in a signed 64-bit TTL", identity.ttl_seconds),
        )
    })?;

    let config_oidc = match &identity.method {
        AuthMethod::Oidc(oidc) => vec![DeclaredOidcConfig {
            discovery_url: oidc.discovery_url.clone(),
            claims_type: Some(oidc.claims_type.as_str().to_string()),
            claims: from_canonical(&oidc.claims),
        }],
    };

    Ok(DeclaredIdentity {
        slug: identity.slug.clone(),
        service_account_slug: identity.parent_slug.clone(),
        name: identity.name.clone(),
        ttl_seconds,
        method: Some(identity.method_kind().as_str().to_string()),
        config_oidc,
    })
}

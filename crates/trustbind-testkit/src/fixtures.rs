//! Declared identity fixtures

use trustbind_identity::{ClaimRule, DeclaredIdentity, DeclaredOidcConfig};

/// The GitHub Actions identity used across the end-to-end tests
pub fn github_actions_identity(service_account_slug: &str) -> DeclaredIdentity {
    DeclaredIdentity {
        slug: None,
        service_account_slug: service_account_slug.to_string(),
        name: "GitHub Actions OIDC".to_string(),
        ttl_seconds: 600,
        method: Some("oidc".to_string()),
        config_oidc: vec![DeclaredOidcConfig {
            discovery_url: "https://token.actions.githubusercontent.com".to_string(),
            claims_type: Some("wildcard".to_string()),
            claims: vec![
                ClaimRule::new("aud", ["https://github.com/DopplerHQ"]),
                ClaimRule::new(
                    "sub",
                    [
                        "repo:DopplerHQ/x:pull_request",
                        "repo:DopplerHQ/x:ref:refs/heads/feature*",
                    ],
                ),
            ],
        }],
    }
}

/// Smallest identity the default claim policy accepts
///
/// `claims_type` and `method` are left for the codec to default or infer.
pub fn minimal_identity(service_account_slug: &str) -> DeclaredIdentity {
    DeclaredIdentity {
        slug: None,
        service_account_slug: service_account_slug.to_string(),
        name: "minimal".to_string(),
        ttl_seconds: 60,
        method: None,
        config_oidc: vec![DeclaredOidcConfig {
            discovery_url: "https://issuer.example/.well-known/openid-configuration".to_string(),
            claims_type: None,
            claims: vec![
                ClaimRule::new("aud", ["api://default"]),
                ClaimRule::new("sub", ["svc:deployer"]),
            ],
        }],
    }
}

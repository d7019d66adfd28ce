//! In-memory identity authority
//!
//! `InMemoryAuthority` implements [`IdentityAuthorityClient`] over a map
//! keyed by `(parent_slug, slug)`. It records every call, can be told to
//! fail the next call, and can mimic authorities that reorder claims or
//! leave default fields off their responses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use trustbind_identity::{
    AuthorityFailure, AuthorityResult, IdentityAuthorityClient, WireEntity, WireRequest,
};

/// A call received by the authority
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityCall {
    /// `create` with the request body as sent
    Create {
        parent_slug: String,
        request: WireRequest,
    },
    /// `read`
    Read { parent_slug: String, slug: String },
    /// `update` with the request body as sent
    Update {
        parent_slug: String,
        request: WireRequest,
    },
    /// `delete`
    Delete { parent_slug: String, slug: String },
}

#[derive(Debug, Default)]
struct AuthorityState {
    identities: BTreeMap<(String, String), WireEntity>,
    next_slugs: VecDeque<String>,
    issued: u64,
    fail_next: Option<AuthorityFailure>,
    calls: Vec<AuthorityCall>,
    reorder_claims: bool,
    omit_exact_claims_type: bool,
}

impl AuthorityState {
    fn take_failure(&mut self) -> AuthorityResult<()> {
        match self.fail_next.take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn issue_slug(&mut self) -> String {
        self.issued += 1;
        self.next_slugs
            .pop_front()
            .unwrap_or_else(|| format!("sai_{:04}", self.issued))
    }

    /// Shape a stored entity the way this authority answers
    fn respond(&self, entity: &WireEntity) -> WireEntity {
        let mut response = entity.clone();
        if let Some(oidc) = response.config_oidc.as_mut() {
            if self.omit_exact_claims_type && oidc.claims_type.as_deref() == Some("exact") {
                oidc.claims_type = None;
            }
            if self.reorder_claims {
                oidc.claims.reverse();
                for claim in &mut oidc.claims {
                    claim.values.reverse();
                }
            }
        }
        response
    }
}

fn entity_from(slug: String, request: &WireRequest) -> WireEntity {
    WireEntity {
        slug,
        name: request.name.clone(),
        ttl_seconds: request.ttl_seconds,
        method: request.method.clone(),
        config_oidc: request.config_oidc.clone(),
    }
}

/// In-memory authority for tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthority {
    state: Arc<Mutex<AuthorityState>>,
}

impl InMemoryAuthority {
    /// Create an empty authority
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the slug assigned by the next `create`
    pub fn with_next_slug(self, slug: impl Into<String>) -> Self {
        self.state.lock().next_slugs.push_back(slug.into());
        self
    }

    /// Return claims and claim values in reverse order
    pub fn with_reordered_claims(self) -> Self {
        self.state.lock().reorder_claims = true;
        self
    }

    /// Leave `claims_type` off responses when it is `exact`
    pub fn with_exact_claims_type_omitted(self) -> Self {
        self.state.lock().omit_exact_claims_type = true;
        self
    }

    /// Make the next call fail with `failure`
    pub fn fail_next(&self, failure: AuthorityFailure) {
        self.state.lock().fail_next = Some(failure);
    }

    /// Store an identity directly, bypassing `create`
    pub fn insert(&self, parent_slug: impl Into<String>, entity: WireEntity) {
        let key = (parent_slug.into(), entity.slug.clone());
        self.state.lock().identities.insert(key, entity);
    }

    /// Remove an identity out of band
    pub fn remove(&self, parent_slug: &str, slug: &str) -> Option<WireEntity> {
        self.state
            .lock()
            .identities
            .remove(&(parent_slug.to_string(), slug.to_string()))
    }

    /// Stored identity, as kept (not as it would be returned)
    pub fn get(&self, parent_slug: &str, slug: &str) -> Option<WireEntity> {
        self.state
            .lock()
            .identities
            .get(&(parent_slug.to_string(), slug.to_string()))
            .cloned()
    }

    /// Number of stored identities
    pub fn len(&self) -> usize {
        self.state.lock().identities.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> Vec<AuthorityCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl IdentityAuthorityClient for InMemoryAuthority {
    async fn create(&self, parent_slug: &str, request: &WireRequest) -> AuthorityResult<WireEntity> {
        let mut state = self.state.lock();
        state.calls.push(AuthorityCall::Create {
            parent_slug: parent_slug.to_string(),
            request: request.clone(),
        });
        state.take_failure()?;

        if request.slug.is_some() {
            return Err(AuthorityFailure::rejected(422, "slug is assigned by the authority"));
        }

        let slug = state.issue_slug();
        let entity = entity_from(slug.clone(), request);
        tracing::debug!(parent_slug = %parent_slug, slug = %slug, "In-memory authority created identity");
        let response = state.respond(&entity);
        state
            .identities
            .insert((parent_slug.to_string(), slug), entity);
        Ok(response)
    }

    async fn read(&self, parent_slug: &str, slug: &str) -> AuthorityResult<WireEntity> {
        let mut state = self.state.lock();
        state.calls.push(AuthorityCall::Read {
            parent_slug: parent_slug.to_string(),
            slug: slug.to_string(),
        });
        state.take_failure()?;

        let key = (parent_slug.to_string(), slug.to_string());
        match state.identities.get(&key) {
            Some(entity) => Ok(state.respond(entity)),
            None => Err(AuthorityFailure::not_found(format!(
                "service account identity {slug} not found"
            ))),
        }
    }

    async fn update(&self, parent_slug: &str, request: &WireRequest) -> AuthorityResult<WireEntity> {
        let mut state = self.state.lock();
        state.calls.push(AuthorityCall::Update {
            parent_slug: parent_slug.to_string(),
            request: request.clone(),
        });
        state.take_failure()?;

        let Some(slug) = request.slug.clone() else {
            return Err(AuthorityFailure::rejected(422, "slug is required"));
        };
        let key = (parent_slug.to_string(), slug.clone());
        if !state.identities.contains_key(&key) {
            return Err(AuthorityFailure::not_found(format!(
                "service account identity {slug} not found"
            )));
        }

        let entity = entity_from(slug, request);
        let response = state.respond(&entity);
        state.identities.insert(key, entity);
        Ok(response)
    }

    async fn delete(&self, parent_slug: &str, slug: &str) -> AuthorityResult<()> {
        let mut state = self.state.lock();
        state.calls.push(AuthorityCall::Delete {
            parent_slug: parent_slug.to_string(),
            slug: slug.to_string(),
        });
        state.take_failure()?;

        match state
            .identities
            .remove(&(parent_slug.to_string(), slug.to_string()))
        {
            Some(_) => Ok(()),
            None => Err(AuthorityFailure::not_found(format!(
                "service account identity {slug} not found"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustbind_identity::{WireClaim, WireOidcConfig};

    fn request() -> WireRequest {
        WireRequest {
            slug: None,
            name: "CI".to_string(),
            ttl_seconds: 600,
            method: "oidc".to_string(),
            config_oidc: Some(WireOidcConfig {
                discovery_url: "https://issuer.example".to_string(),
                claims_type: Some("exact".to_string()),
                claims: vec![
                    WireClaim {
                        key: "aud".to_string(),
                        values: vec!["A".to_string(), "B".to_string()],
                    },
                    WireClaim {
                        key: "sub".to_string(),
                        values: vec!["S".to_string()],
                    },
                ],
            }),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_queued_slug() {
        let authority = InMemoryAuthority::new().with_next_slug("abc123");

        let entity = authority.create("sa_ci", &request()).await.unwrap();
        assert_eq!(entity.slug, "abc123");
        assert!(authority.get("sa_ci", "abc123").is_some());

        let entity = authority.create("sa_ci", &request()).await.unwrap();
        assert_eq!(entity.slug, "sai_0002");
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let authority = InMemoryAuthority::new();
        authority.fail_next(AuthorityFailure::transport("reset"));

        assert!(authority.create("sa_ci", &request()).await.is_err());
        assert!(authority.create("sa_ci", &request()).await.is_ok());
        assert_eq!(authority.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_response_shaping() {
        let authority = InMemoryAuthority::new()
            .with_next_slug("abc123")
            .with_reordered_claims()
            .with_exact_claims_type_omitted();

        let entity = authority.create("sa_ci", &request()).await.unwrap();
        let oidc = entity.config_oidc.unwrap();
        assert_eq!(oidc.claims_type, None);
        assert_eq!(oidc.claims[0].key, "sub");
        assert_eq!(oidc.claims[1].values, vec!["B", "A"]);

        let stored = authority.get("sa_ci", "abc123").unwrap();
        assert_eq!(stored.config_oidc.unwrap().claims[0].key, "aud");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let authority = InMemoryAuthority::new();

        let err = authority.read("sa_ci", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}

//! Authority collaborator interface
//!
//! Transport, authentication, timeouts and retries all live behind this
//! trait. The reconciler makes at most one call per lifecycle operation and
//! forwards whatever failure comes back.

use crate::errors::AuthorityFailure;
use crate::wire::{WireEntity, WireRequest};
use async_trait::async_trait;

/// Result type for collaborator calls
pub type AuthorityResult<T> = std::result::Result<T, AuthorityFailure>;

/// Remote service of record for service account identities
#[async_trait]
pub trait IdentityAuthorityClient: Send + Sync {
    /// Create an identity under `parent_slug`; the response carries the new slug
    async fn create(&self, parent_slug: &str, request: &WireRequest) -> AuthorityResult<WireEntity>;

    /// Fetch an identity; an absent identity is reported as [`AuthorityFailure::NotFound`]
    async fn read(&self, parent_slug: &str, slug: &str) -> AuthorityResult<WireEntity>;

    /// Replace the mutable fields of the identity named by `request.slug`
    async fn update(&self, parent_slug: &str, request: &WireRequest) -> AuthorityResult<WireEntity>;

    /// Remove an identity
    async fn delete(&self, parent_slug: &str, slug: &str) -> AuthorityResult<()>;
}

#[async_trait]
impl<T> IdentityAuthorityClient for std::sync::Arc<T>
where
    T: IdentityAuthorityClient + ?Sized,
{
    async fn create(&self, parent_slug: &str, request: &WireRequest) -> AuthorityResult<WireEntity> {
        (**self).create(parent_slug, request).await
    }

    async fn read(&self, parent_slug: &str, slug: &str) -> AuthorityResult<WireEntity> {
        (**self).read(parent_slug, slug).await
    }

    async fn update(&self, parent_slug: &str, request: &WireRequest) -> AuthorityResult<WireEntity> {
        (**self).update(parent_slug, request).await
    }

    async fn delete(&self, parent_slug: &str, slug: &str) -> AuthorityResult<()> {
        (**self).delete(parent_slug, slug).await
    }
}

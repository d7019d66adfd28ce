//! Identity lifecycle against the authority
//!
//! Each operation is a single round trip: validate and encode locally, make
//! one collaborator call, decode the answer. Nothing is cached between
//! calls, nothing is retried, and no partial state survives a failure.

use crate::client::IdentityAuthorityClient;
use crate::codec::{decode, encode, from_declared, RequestKind};
use crate::config::ReconcilerConfig;
use crate::declarative::{DeclaredIdentity, IdentityHandle};
use crate::errors::{AuthorityFailure, Operation, ReconcileError, Result};
use crate::types::IdentityConfig;

/// Outcome of reading an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The authority returned the identity
    Found(IdentityConfig),
    /// The identity no longer exists remotely and should be treated as absent
    NotFound,
}

impl ReadOutcome {
    /// The observed identity, if one was found
    pub fn found(&self) -> Option<&IdentityConfig> {
        match self {
            Self::Found(identity) => Some(identity),
            Self::NotFound => None,
        }
    }

    /// Record the outcome in the front end's persisted handle
    ///
    /// A missing identity clears the handle so the next reconciliation
    /// creates it again.
    pub fn apply_to(&self, handle: &mut IdentityHandle) {
        match self {
            Self::Found(identity) => handle.slug.clone_from(&identity.slug),
            Self::NotFound => handle.clear(),
        }
    }
}

/// Drives create/read/update/delete for service account identities
#[derive(Debug)]
pub struct IdentityReconciler<C> {
    client: C,
    config: ReconcilerConfig,
}

impl<C: IdentityAuthorityClient> IdentityReconciler<C> {
    /// Create a reconciler with the default configuration
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: ReconcilerConfig::default(),
        }
    }

    /// Create a reconciler with an explicit configuration
    pub fn with_config(client: C, config: ReconcilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// Active configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Underlying authority client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create `desired` under `parent_slug` and return it as the authority stored it
    pub async fn create(
        &self,
        parent_slug: &str,
        desired: &DeclaredIdentity,
    ) -> Result<IdentityConfig> {
        ensure_parent(parent_slug, desired)?;
        let identity = from_declared(desired, &self.config)?;
        let request = encode(&identity, RequestKind::Create, &self.config)?;

        let entity = self
            .client
            .create(parent_slug, &request)
            .await
            .map_err(|source| authority_failure(Operation::Create, parent_slug, source))?;

        let observed = decode(&entity, parent_slug)
            .map_err(|err| undecodable(Operation::Create, parent_slug, &entity.slug, err))?;
        tracing::info!(
            parent_slug = %parent_slug,
            slug = %entity.slug,
            claim_keys = request.config_oidc.as_ref().map_or(0, |oidc| oidc.claims.len()),
            "Created service account identity"
        );
        Ok(observed)
    }

    /// Fetch the current remote state of an identity
    pub async fn read(&self, parent_slug: &str, slug: &str) -> Result<ReadOutcome> {
        match self.client.read(parent_slug, slug).await {
            Ok(entity) => {
                let observed = decode(&entity, parent_slug)?;
                tracing::debug!(parent_slug = %parent_slug, slug = %slug, "Read service account identity");
                Ok(ReadOutcome::Found(observed))
            }
            Err(source) if source.is_not_found() => {
                tracing::warn!(
                    parent_slug = %parent_slug,
                    slug = %slug,
                    "Service account identity not found, treating as deleted"
                );
                Ok(ReadOutcome::NotFound)
            }
            Err(source) => Err(authority_failure(Operation::Read, parent_slug, source)),
        }
    }

    /// Update the mutable fields of an existing identity
    ///
    /// `desired.slug` names the identity. The parent is never sent as a
    /// mutable field; moving an identity to another parent is a replacement.
    pub async fn update(
        &self,
        parent_slug: &str,
        desired: &DeclaredIdentity,
    ) -> Result<IdentityConfig> {
        ensure_parent(parent_slug, desired)?;
        let identity = from_declared(desired, &self.config)?;
        let request = encode(&identity, RequestKind::Update, &self.config)?;

        let entity = self
            .client
            .update(parent_slug, &request)
            .await
            .map_err(|source| authority_failure(Operation::Update, parent_slug, source))?;

        let observed = decode(&entity, parent_slug)
            .map_err(|err| undecodable(Operation::Update, parent_slug, &entity.slug, err))?;
        tracing::info!(
            parent_slug = %parent_slug,
            slug = %entity.slug,
            "Updated service account identity"
        );
        Ok(observed)
    }

    /// Delete an identity
    pub async fn delete(&self, parent_slug: &str, slug: &str) -> Result<()> {
        if slug.is_empty() {
            return Err(ReconcileError::invalid_field(
                "slug",
                "an existing slug is required to delete an identity",
            ));
        }

        self.client
            .delete(parent_slug, slug)
            .await
            .map_err(|source| authority_failure(Operation::Delete, parent_slug, source))?;

        tracing::info!(parent_slug = %parent_slug, slug = %slug, "Deleted service account identity");
        Ok(())
    }
}

fn ensure_parent(parent_slug: &str, desired: &DeclaredIdentity) -> Result<()> {
    if desired.service_account_slug != parent_slug {
        return Err(ReconcileError::invalid_field(
            "service_account_slug",
            format!(
                "declared parent {:?} does not match target {parent_slug:?}",
                desired.service_account_slug
            ),
        ));
    }
    Ok(())
}

fn authority_failure(
    operation: Operation,
    parent_slug: &str,
    source: AuthorityFailure,
) -> ReconcileError {
    tracing::warn!(
        operation = %operation,
        parent_slug = %parent_slug,
        error = %source,
        "Authority call failed"
    );
    ReconcileError::authority(operation, source)
}

/// The authority accepted the write but its answer cannot be represented.
/// The remote object exists under `slug`, so it is logged for recovery.
fn undecodable(
    operation: Operation,
    parent_slug: &str,
    slug: &str,
    err: ReconcileError,
) -> ReconcileError {
    tracing::warn!(
        operation = %operation,
        parent_slug = %parent_slug,
        slug = %slug,
        error = %err,
        "Authority stored identity but its response could not be decoded"
    );
    err
}

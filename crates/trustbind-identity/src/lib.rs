//! Trustbind Identity
//!
//! Reconciles declaratively described service account identities (OIDC
//! federated credentials) against the authority that stores them.
//!
//! The crate is the pure core of that reconciliation:
//! - canonicalization of claim rules into an order-free mapping
//! - conversion between declarative input, wire payloads and the canonical model
//! - the create/read/update/delete lifecycle against an [`IdentityAuthorityClient`]
//! - drift detection deciding whether an update is needed
//!
//! Transport, authentication, retries and the configuration front end are
//! collaborators; this crate only sees them through [`IdentityAuthorityClient`]
//! and the [`declarative`] shapes.

pub mod claims;
pub mod client;
pub mod codec;
pub mod config;
pub mod declarative;
pub mod equivalence;
pub mod errors;
pub mod reconciler;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use claims::{from_canonical, to_canonical, ClaimRule, ClaimSet};
pub use client::{AuthorityResult, IdentityAuthorityClient};
pub use codec::{decode, encode, from_declared, to_declared, RequestKind};
pub use config::{ClaimPolicy, ReconcilerConfig};
pub use declarative::{DeclaredIdentity, DeclaredOidcConfig, IdentityHandle};
pub use equivalence::{drift, equivalent, plan, DriftField, Plan};
pub use errors::{AuthorityFailure, Operation, ReconcileError, Result};
pub use reconciler::{IdentityReconciler, ReadOutcome};
pub use types::{AuthMethod, ClaimsType, IdentityConfig, MethodKind, OidcConfig};
pub use wire::{WireClaim, WireEntity, WireOidcConfig, WireRequest};

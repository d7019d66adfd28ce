//! Error taxonomy for identity reconciliation
//!
//! Validation failures are raised before any authority call is attempted.
//! Authority failures are forwarded verbatim, wrapped with the lifecycle
//! operation that produced them.

use std::fmt;

/// Failure reported by the [`IdentityAuthorityClient`](crate::IdentityAuthorityClient) collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityFailure {
    /// The authority has no record of the requested identity
    #[error("Not found: {message}")]
    NotFound {
        /// Message returned by the authority
        message: String,
    },

    /// The authority refused the request (validation, authorization, conflict)
    #[error("Rejected ({status}): {message}")]
    Rejected {
        /// Status code reported by the authority
        status: u16,
        /// Message returned by the authority
        message: String,
    },

    /// The request never produced an authority verdict
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure
        message: String,
    },
}

impl AuthorityFailure {
    /// Create a not found failure
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a rejection failure
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create a transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether the authority reported the object as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Lifecycle operation that reached the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Identity creation
    Create,
    /// Identity lookup
    Read,
    /// In-place identity update
    Update,
    /// Identity removal
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Reconciliation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The same claim key was declared more than once
    #[error("Duplicate claim key: {key}")]
    DuplicateClaimKey {
        /// The repeated key
        key: String,
    },

    /// A claim key was declared without any allowed values
    #[error("Claim {key} has no allowed values")]
    EmptyValueSet {
        /// The key with the empty value set
        key: String,
    },

    /// Desired state names a method this crate cannot encode
    #[error("Unsupported auth method: {method}")]
    UnsupportedMethod {
        /// The method as declared
        method: String,
    },

    /// The authority returned a method this crate cannot decode
    #[error("Unknown auth method type: {method}")]
    UnknownAuthMethod {
        /// The method as returned by the authority
        method: String,
    },

    /// A declared field violates an identity invariant
    #[error("Invalid {field}: {message}")]
    InvalidField {
        /// Path of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// The authority payload cannot be mapped onto an identity
    #[error("Malformed authority response at {field}: {message}")]
    MalformedResponse {
        /// Path of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// The authority call failed
    #[error("Authority {operation} failed: {source}")]
    Authority {
        /// Operation that was attempted
        operation: Operation,
        /// Underlying collaborator failure
        #[source]
        source: AuthorityFailure,
    },

    /// Reconciler configuration could not be loaded or is invalid
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl ReconcileError {
    /// Create an invalid field error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap a collaborator failure
    pub fn authority(operation: Operation, source: AuthorityFailure) -> Self {
        Self::Authority { operation, source }
    }
}

/// Standard Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_key() {
        let err = ReconcileError::DuplicateClaimKey {
            key: "aud".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate claim key: aud");

        let err = ReconcileError::invalid_field("ttl_seconds", "must not be negative");
        assert_eq!(err.to_string(), "Invalid ttl_seconds: must not be negative");
    }

    #[test]
    fn test_authority_error_keeps_source() {
        use std::error::Error;

        let err = ReconcileError::authority(
            Operation::Update,
            AuthorityFailure::rejected(422, "ttl too large"),
        );
        assert_eq!(
            err.to_string(),
            "Authority update failed: Rejected (422): ttl too large"
        );
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Rejected (422): ttl too large"));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(AuthorityFailure::not_found("gone").is_not_found());
        assert!(!AuthorityFailure::transport("reset").is_not_found());
        assert!(!AuthorityFailure::rejected(404, "looks similar").is_not_found());
    }
}

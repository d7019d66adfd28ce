//! Trustbind Testkit
//!
//! Test doubles for the identity authority plus fixture builders shared by
//! the integration tests of `trustbind-identity`.

pub mod authority;
pub mod fixtures;

pub use authority::{AuthorityCall, InMemoryAuthority};
pub use fixtures::{github_actions_identity, minimal_identity};

//! Security module
//!
//! Credential handling for the remote providers.

pub mod credentials;

pub use credentials::{CredentialSet, Provider};

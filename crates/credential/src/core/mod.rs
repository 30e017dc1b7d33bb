//! Core types: errors and request scope.

mod error;
mod scope;

pub use error::{ConfigError, CredentialError, CredentialResult, ValidationError};
pub use scope::CredentialScope;

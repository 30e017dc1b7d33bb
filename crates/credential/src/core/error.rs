//! Error types for credential operations
//!
//! - [`ValidationError`]: a credential value failed its kind's checks
//! - [`ConfigError`]: catalog properties could not build a provider
//! - [`CredentialError`]: everything `get_credential` can return
//!
//! Messages name keys, kinds, providers and catalogs. They never carry
//! credential values.
//!
//! ```
//! use keystone_credential::{CredentialError, ValidationError};
//!
//! let err: CredentialError = ValidationError::BlankValue {
//!     kind: "s3-secret-key".into(),
//!     key: "s3-secret-access-key".into(),
//! }
//! .into();
//! assert!(err.to_string().contains("s3-secret-access-key"));
//! ```

use std::time::Duration;

use thiserror::Error;

/// A credential payload or expiry is inconsistent with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No kind with this name is registered
    #[error("Unknown credential type '{kind}'")]
    UnknownKind {
        /// The requested kind name
        kind: String,
    },

    /// A key the kind requires is absent
    #[error("Credential '{kind}' is missing required key '{key}'")]
    MissingKey {
        /// Kind name
        kind: String,
        /// Missing key
        key: String,
    },

    /// A payload key is empty or whitespace
    #[error("Credential '{kind}' contains a blank key")]
    BlankKey {
        /// Kind name
        kind: String,
    },

    /// A payload value is empty or whitespace
    #[error("Credential '{kind}' has a blank value for key '{key}'")]
    BlankValue {
        /// Kind name
        kind: String,
        /// Key whose value is blank
        key: String,
    },

    /// The payload contains a key the kind does not declare
    #[error("Credential '{kind}' does not accept key '{key}'")]
    UnexpectedKey {
        /// Kind name
        kind: String,
        /// Undeclared key
        key: String,
    },

    /// A non-expiring kind was given an expiry
    #[error("Credential '{kind}' does not expire, expire time must be 0 (got {expire_time_ms})")]
    ExpiryMustBeZero {
        /// Kind name
        kind: String,
        /// Offending expiry
        expire_time_ms: i64,
    },

    /// An expiring kind was given a non-positive expiry
    #[error("Credential '{kind}' expires, expire time must be positive (got {expire_time_ms})")]
    ExpiryMustBePositive {
        /// Kind name
        kind: String,
        /// Offending expiry
        expire_time_ms: i64,
    },
}

/// Catalog properties cannot produce a provider.
///
/// Raised while a catalog is loaded, never deferred to the first request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidValue {
        /// Property name
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Missing required configuration
    #[error("Missing required configuration: {field}")]
    MissingRequired {
        /// Property name
        field: String,
    },

    /// The catalog names a provider no factory is registered for
    #[error("Unknown credential provider '{name}'")]
    UnknownProvider {
        /// Provider name
        name: String,
    },
}

/// Errors returned by credential lookups.
///
/// `Clone` so that one refresh outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// A credential value failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Catalog configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The provider could not mint a credential
    #[error("Credential provider '{provider}' failed to generate a credential: {reason}")]
    Generation {
        /// Provider name
        provider: String,
        /// Upstream cause, free of secret material
        reason: String,
    },

    /// Waiting for an in-flight refresh took too long
    #[error("Timed out after {waited:?} waiting for provider '{provider}' in catalog '{catalog}'")]
    Timeout {
        /// Catalog name
        catalog: String,
        /// Provider name
        provider: String,
        /// How long the caller waited
        waited: Duration,
    },

    /// No providers are loaded for the catalog
    #[error("Catalog '{catalog}' has no credential providers loaded")]
    CatalogNotLoaded {
        /// Catalog name
        catalog: String,
    },

    /// The catalog does not configure this provider
    #[error("Catalog '{catalog}' has no credential provider '{provider}'")]
    ProviderNotFound {
        /// Catalog name
        catalog: String,
        /// Provider name
        provider: String,
    },
}

impl CredentialError {
    /// Build a generation error.
    pub fn generation(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Generation {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry by the caller may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation { .. } | Self::Timeout { .. })
    }
}

/// Result type alias for credential operations
pub type CredentialResult<T> = Result<T, CredentialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_key_not_value() {
        let err = ValidationError::BlankValue {
            kind: "s3-secret-key".into(),
            key: "s3-secret-access-key".into(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"Credential 's3-secret-key' has a blank value for key 's3-secret-access-key'"
        );
    }

    #[test]
    fn retryable_errors() {
        assert!(CredentialError::generation("s3-token", "sts unavailable").is_retryable());
        assert!(
            CredentialError::Timeout {
                catalog: "lake".into(),
                provider: "s3-token".into(),
                waited: Duration::from_secs(1),
            }
            .is_retryable()
        );
        assert!(
            !CredentialError::CatalogNotLoaded {
                catalog: "lake".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn config_error_converts() {
        let err: CredentialError = ConfigError::MissingRequired {
            field: "s3-access-key-id".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required configuration: s3-access-key-id"
        );
    }
}

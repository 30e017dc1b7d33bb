//! Keystone Credential - storage credential vending for catalogs
//!
//! Brokers access credentials that let client engines reach the object
//! stores and file systems behind catalog objects.
//!
//! # Features
//!
//! - **Immutable credentials** - validated on construction, cheap to clone,
//!   zeroized on drop, redacted in `Debug`
//! - **Pluggable kinds** - a name → kind registry; built-ins for S3, OSS,
//!   Azure, ADLS and GCS
//! - **Pluggable providers** - one factory per backend, configured from
//!   catalog properties and validated at load time
//! - **Expiry-aware cache** - refresh ahead of expiry, never serve past it
//! - **Single-flight refresh** - one provider call per key however many
//!   callers are waiting
#![deny(unsafe_code)]
#![forbid(unsafe_code)]

/// Core types and errors
pub mod core;
/// Credential values and kinds
pub mod credential;
/// Credential manager - cached access to catalog credentials
pub mod manager;
/// Credential provider implementations
pub mod providers;
/// Time utilities
pub mod utils;

// ── Root re-exports ─────────────────────────────────────────────────────────
// Commonly-used types available directly as `keystone_credential::TypeName`.

pub use crate::core::{
    ConfigError, CredentialError, CredentialResult, CredentialScope, ValidationError,
};

pub use crate::credential::builtin::{
    AdlsToken, AzureAccountKey, GcsToken, OssSecretKey, OssToken, S3SecretKey, S3Token,
};
pub use crate::credential::{
    Credential, CredentialDto, CredentialKind, ExpiryPolicy, KindRegistry,
};

pub use crate::manager::{
    CacheKey, CacheStats, CredentialManager, CredentialManagerBuilder, ManagerConfig,
};

pub use crate::providers::{
    CatalogProperties, CredentialProvider, ProviderConfig, ProviderRegistry, SessionTokenIssuer,
};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::core::{CredentialError, CredentialResult, CredentialScope};
    pub use crate::credential::{Credential, CredentialKind, KindRegistry};
    pub use crate::manager::{CredentialManager, ManagerConfig};
    pub use crate::providers::{CatalogProperties, CredentialProvider, ProviderRegistry};
}

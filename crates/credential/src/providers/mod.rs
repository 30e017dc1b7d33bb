//! Credential providers
//!
//! A provider mints credentials for one storage backend and auth mode. It is
//! built from a catalog's properties when the catalog is loaded:
//!
//! - [`S3SecretKeyProvider`] - static S3 access key pair (`s3-secret-key`)
//! - [`S3TokenProvider`] - scoped STS session credentials (`s3-token`)
//! - [`AzureAccountKeyProvider`] - Azure storage account key (`azure-account-key`)

mod azure;
mod config;
mod registry;
mod s3;

use async_trait::async_trait;

pub use azure::{AZURE_ACCOUNT_KEY_PROVIDER, AzureAccountKeyConfig, AzureAccountKeyProvider};
pub use config::{CREDENTIAL_PROVIDERS, CatalogProperties, ProviderConfig};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use s3::{
    AssumeRoleRequest, IssuerError, S3_SECRET_KEY_PROVIDER, S3_TOKEN_PROVIDER, S3SecretKeyConfig,
    S3SecretKeyProvider, S3TokenConfig, S3TokenProvider, SessionToken, SessionTokenIssuer,
    session_policy,
};

use crate::core::{CredentialResult, CredentialScope};
use crate::credential::Credential;

/// Mints credentials for one backend.
///
/// Implementations must be safe to call concurrently; the manager already
/// collapses concurrent requests for the same scope into one call.
///
/// Errors should be [`CredentialError::Generation`] with a reason that
/// contains no secret material. Other variants are reported to callers as
/// generation failures.
///
/// [`CredentialError::Generation`]: crate::CredentialError::Generation
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Provider name, matching its registry entry
    fn name(&self) -> &str;

    /// Wire name of the credential kind this provider issues
    fn credential_type(&self) -> &str;

    /// Produce one credential valid for `scope`
    async fn get_credential(&self, scope: &CredentialScope) -> CredentialResult<Credential>;
}

//! Provider factories keyed by provider name

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::config::{CatalogProperties, ProviderConfig};
use super::{
    AzureAccountKeyConfig, AzureAccountKeyProvider, CredentialProvider, S3SecretKeyConfig,
    S3SecretKeyProvider,
};
use crate::core::ConfigError;

/// Builds a provider from a catalog's properties.
pub type ProviderFactory =
    Arc<dyn Fn(&CatalogProperties) -> Result<Arc<dyn CredentialProvider>, ConfigError> + Send + Sync>;

/// Name → factory map consulted when a catalog is loaded.
///
/// Adding a backend means registering one factory here; the manager never
/// changes.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the static-key providers, which need no external client.
    ///
    /// `s3-token` needs a session-token issuer and is added with
    /// [`register_s3_token`](Self::register_s3_token).
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(super::s3::S3_SECRET_KEY_PROVIDER, |props| {
            let config = S3SecretKeyConfig::from_properties(props)?;
            Ok(Arc::new(S3SecretKeyProvider::new(config)?) as Arc<dyn CredentialProvider>)
        });
        registry.register(super::azure::AZURE_ACCOUNT_KEY_PROVIDER, |props| {
            let config = AzureAccountKeyConfig::from_properties(props)?;
            Ok(Arc::new(AzureAccountKeyProvider::new(config)?) as Arc<dyn CredentialProvider>)
        });
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&CatalogProperties) -> Result<Arc<dyn CredentialProvider>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Whether a factory is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build one provider
    pub fn build(
        &self,
        name: &str,
        properties: &CatalogProperties,
    ) -> Result<Arc<dyn CredentialProvider>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: name.to_string(),
            })?;
        factory(properties)
    }

    /// Build every provider the catalog lists under `credential-providers`.
    ///
    /// Fails on the first unknown name or invalid property, so a catalog is
    /// either loaded with all of its providers or not at all.
    pub fn build_for_catalog(
        &self,
        properties: &CatalogProperties,
    ) -> Result<HashMap<String, Arc<dyn CredentialProvider>>, ConfigError> {
        let mut providers = HashMap::new();
        for name in properties.credential_providers() {
            let provider = self.build(name, properties)?;
            providers.insert(name.to_string(), provider);
        }
        Ok(providers)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

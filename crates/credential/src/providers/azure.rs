//! Azure storage account key provider

use std::fmt;

use async_trait::async_trait;

use super::CredentialProvider;
use super::config::{CatalogProperties, ProviderConfig};
use crate::core::{ConfigError, CredentialResult, CredentialScope};
use crate::credential::Credential;
use crate::credential::builtin::{
    AZURE_STORAGE_ACCOUNT_KEY, AZURE_STORAGE_ACCOUNT_NAME, AzureAccountKey,
};

/// Provider name of [`AzureAccountKeyProvider`]
pub const AZURE_ACCOUNT_KEY_PROVIDER: &str = "azure-account-key";

/// Configuration of [`AzureAccountKeyProvider`]
#[derive(Clone)]
pub struct AzureAccountKeyConfig {
    /// Storage account name
    pub account_name: String,
    /// Shared account key
    pub account_key: String,
}

impl fmt::Debug for AzureAccountKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureAccountKeyConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig for AzureAccountKeyConfig {
    fn from_properties(properties: &CatalogProperties) -> Result<Self, ConfigError> {
        Ok(Self {
            account_name: properties.required(AZURE_STORAGE_ACCOUNT_NAME)?.to_string(),
            account_key: properties.required(AZURE_STORAGE_ACCOUNT_KEY)?.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        AZURE_ACCOUNT_KEY_PROVIDER
    }
}

/// Hands out the catalog's storage account key
#[derive(Debug)]
pub struct AzureAccountKeyProvider {
    credential: Credential,
}

impl AzureAccountKeyProvider {
    /// Build the provider and its credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the values do not form a valid
    /// `azure-account-key` credential.
    pub fn new(config: AzureAccountKeyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let credential =
            AzureAccountKey::credential(config.account_name.as_str(), config.account_key.as_str())
                .map_err(|e| ConfigError::InvalidValue {
                    field: AZURE_ACCOUNT_KEY_PROVIDER.to_string(),
                    reason: e.to_string(),
                })?;
        Ok(Self { credential })
    }
}

#[async_trait]
impl CredentialProvider for AzureAccountKeyProvider {
    fn name(&self) -> &str {
        AZURE_ACCOUNT_KEY_PROVIDER
    }

    fn credential_type(&self) -> &str {
        AzureAccountKey::NAME
    }

    async fn get_credential(&self, _scope: &CredentialScope) -> CredentialResult<Credential> {
        Ok(self.credential.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issues_account_key() {
        let props = CatalogProperties::new()
            .with(AZURE_STORAGE_ACCOUNT_NAME, "lakeacct")
            .with(AZURE_STORAGE_ACCOUNT_KEY, "a2V5PT0=");
        let provider =
            AzureAccountKeyProvider::new(AzureAccountKeyConfig::from_properties(&props).unwrap())
                .unwrap();

        let credential = provider.get_credential(&CredentialScope::Catalog).await.unwrap();
        let view = AzureAccountKey::view(&credential).unwrap();
        assert_eq!(view.account_name(), "lakeacct");
        assert_eq!(view.account_key(), "a2V5PT0=");
    }

    #[test]
    fn requires_account_key() {
        let props = CatalogProperties::new().with(AZURE_STORAGE_ACCOUNT_NAME, "lakeacct");
        assert_eq!(
            AzureAccountKeyConfig::from_properties(&props).unwrap_err(),
            ConfigError::MissingRequired {
                field: AZURE_STORAGE_ACCOUNT_KEY.into()
            }
        );
    }
}

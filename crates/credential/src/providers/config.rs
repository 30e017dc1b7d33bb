//! Catalog properties and provider configuration

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::core::ConfigError;

/// Catalog property naming the providers to build, comma-separated
pub const CREDENTIAL_PROVIDERS: &str = "credential-providers";

/// Property map a catalog was created with.
///
/// Values may hold secrets, so `Debug` prints keys only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CatalogProperties {
    entries: HashMap<String, String>,
}

impl CatalogProperties {
    /// Empty property map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, builder style
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Raw lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// A property that must be present and non-blank
    pub fn required(&self, key: &str) -> Result<&str, ConfigError> {
        self.optional(key)?
            .ok_or_else(|| ConfigError::MissingRequired {
                field: key.to_string(),
            })
    }

    /// A property that may be absent but must be non-blank if present
    pub fn optional(&self, key: &str) -> Result<Option<&str>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue {
                field: key.to_string(),
                reason: "must not be blank".to_string(),
            }),
            Some(value) => Ok(Some(value)),
        }
    }

    /// Parse an optional property, falling back to `default` when absent
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                field: key.to_string(),
                reason: format!("{e}"),
            }),
        }
    }

    /// Comma-separated list property; blank items are skipped
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Provider names listed under [`CREDENTIAL_PROVIDERS`]
    pub fn credential_providers(&self) -> Vec<&str> {
        self.list(CREDENTIAL_PROVIDERS)
    }
}

impl fmt::Debug for CatalogProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort_unstable();
        f.debug_struct("CatalogProperties")
            .field("keys", &keys)
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for CatalogProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for CatalogProperties {
    fn from(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

/// Typed configuration of one provider, read from catalog properties.
///
/// # Contract
///
/// - `from_properties()` reads and checks every property the provider needs,
///   so a bad catalog fails when it is loaded rather than on first use
/// - `validate()` checks cross-field rules on an already-built config
/// - `provider_name()` is the name the provider registers under
pub trait ProviderConfig: Sized + Send + Sync + Clone {
    /// Read the config from catalog properties and validate it
    fn from_properties(properties: &CatalogProperties) -> Result<Self, ConfigError>;

    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Configuration is valid
    /// * `Err(ConfigError)` - Configuration has errors with details
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Provider name for logging and registration
    fn provider_name(&self) -> &'static str;
}

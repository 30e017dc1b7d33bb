//! Credential Manager - per-catalog providers behind an expiry-aware cache
//!
//! Lookups are served from the cache while fresh. A miss joins or starts a
//! single refresh per key, which runs on its own task so that a caller giving
//! up never cancels it.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::cache::{CacheKey, CacheStats, CredentialCache};
use super::config::ManagerConfig;
use super::refresh::{Join, RefreshCoordinator, RefreshFuture};
use crate::core::{ConfigError, CredentialError, CredentialResult, CredentialScope};
use crate::credential::Credential;
use crate::providers::{CatalogProperties, CredentialProvider, ProviderRegistry};
use crate::utils::time::{duration_millis, now_millis};

/// Providers built for one loaded catalog.
///
/// Replaced as a whole when the catalog is reloaded; refreshes compare their
/// snapshot against the current one before caching.
struct CatalogProviders {
    providers: HashMap<String, Arc<dyn CredentialProvider>>,
}

struct ManagerInner {
    registry: ProviderRegistry,
    config: ManagerConfig,
    catalogs: DashMap<String, Arc<CatalogProviders>>,
    cache: CredentialCache,
    refresh: RefreshCoordinator,
}

/// Central credential manager: provider lookup, caching and single-flight refresh
///
/// Cheap to clone; clones share the same catalogs and cache.
///
/// # Examples
///
/// ```
/// use keystone_credential::{
///     CatalogProperties, CredentialManager, CredentialScope, ProviderRegistry,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = CredentialManager::builder()
///     .registry(ProviderRegistry::builtin())
///     .build();
///
/// let props = CatalogProperties::new()
///     .with("credential-providers", "s3-secret-key")
///     .with("s3-access-key-id", "AKIAEXAMPLE")
///     .with("s3-secret-access-key", "secret123");
/// manager.load_catalog("lake", &props)?;
///
/// let credential = manager
///     .get_credential("lake", "s3-secret-key", &CredentialScope::Catalog)
///     .await?;
/// assert_eq!(credential.credential_type(), "s3-secret-key");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CredentialManager {
    inner: Arc<ManagerInner>,
}

impl CredentialManager {
    /// Create builder for constructing manager instance
    pub fn builder() -> CredentialManagerBuilder<NoRegistry> {
        CredentialManagerBuilder::new()
    }

    /// Manager with default configuration
    pub fn new(registry: ProviderRegistry) -> Self {
        Self::builder().registry(registry).build()
    }

    /// Build and install the providers a catalog lists.
    ///
    /// Reloading a catalog replaces its providers and drops its cached
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unknown providers or invalid properties.
    /// The previously loaded providers, if any, stay in place.
    pub fn load_catalog(
        &self,
        catalog: &str,
        properties: &CatalogProperties,
    ) -> Result<(), ConfigError> {
        let providers = self
            .inner
            .registry
            .build_for_catalog(properties)
            .inspect_err(|e| warn!(catalog, error = %e, "Failed to load credential providers"))?;

        let mut names: Vec<&str> = providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        info!(catalog, providers = ?names, "Loaded credential providers");

        let previous = self
            .inner
            .catalogs
            .insert(catalog.to_string(), Arc::new(CatalogProviders { providers }));
        if previous.is_some() {
            let purged = self.inner.cache.purge_catalog(catalog);
            debug!(catalog, purged, "Replaced catalog providers");
        }
        Ok(())
    }

    /// Drop a catalog's providers and every cached credential it issued.
    ///
    /// Returns `false` if the catalog was not loaded.
    pub fn unload_catalog(&self, catalog: &str) -> bool {
        let removed = self.inner.catalogs.remove(catalog).is_some();
        let purged = self.inner.cache.purge_catalog(catalog);
        if removed {
            info!(catalog, purged, "Unloaded credential providers");
        }
        removed
    }

    /// Whether `catalog` has providers loaded
    pub fn is_loaded(&self, catalog: &str) -> bool {
        self.inner.catalogs.contains_key(catalog)
    }

    /// Credential kinds the catalog's providers issue, sorted and deduplicated
    pub fn credential_types(&self, catalog: &str) -> CredentialResult<Vec<String>> {
        let providers = self.catalog(catalog)?;
        let mut types: Vec<String> = providers
            .providers
            .values()
            .map(|provider| provider.credential_type().to_string())
            .collect();
        types.sort_unstable();
        types.dedup();
        Ok(types)
    }

    /// Get a credential for `scope` from `provider` of `catalog`.
    ///
    /// Returns the cached credential while it is fresh. Otherwise joins the
    /// refresh in flight for the same key or starts one, and waits for it up
    /// to the configured `wait_timeout`.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::CatalogNotLoaded`] / [`CredentialError::ProviderNotFound`]
    ///   for unknown names
    /// - [`CredentialError::Generation`] if the provider fails
    /// - [`CredentialError::Timeout`] if the refresh outlasts `wait_timeout`;
    ///   the refresh keeps running and later callers may pick up its result
    pub async fn get_credential(
        &self,
        catalog: &str,
        provider: &str,
        scope: &CredentialScope,
    ) -> CredentialResult<Credential> {
        let providers = self.catalog(catalog)?;
        let provider_impl = providers.providers.get(provider).cloned().ok_or_else(|| {
            CredentialError::ProviderNotFound {
                catalog: catalog.to_string(),
                provider: provider.to_string(),
            }
        })?;

        let key = CacheKey::new(catalog, provider, scope.clone());
        if let Some(credential) = self.inner.cache.lookup(&key, now_millis()) {
            debug!(catalog, provider, %scope, "Cache hit for credential");
            return Ok(credential);
        }

        let flight = match self.inner.refresh.join_or_start(
            &key,
            || self.inner.cache.peek_fresh(&key, now_millis()),
            || self.start_refresh(key.clone(), providers, provider_impl),
        ) {
            Join::Cached(credential) => return Ok(credential),
            Join::Waiting(flight) => flight,
        };

        let wait_timeout = self.inner.config.wait_timeout;
        tokio::time::timeout(wait_timeout, flight)
            .await
            .unwrap_or_else(|_| {
                warn!(
                    catalog,
                    provider,
                    %scope,
                    waited_ms = duration_millis(wait_timeout),
                    "Timed out waiting for credential refresh"
                );
                Err(CredentialError::Timeout {
                    catalog: catalog.to_string(),
                    provider: provider.to_string(),
                    waited: wait_timeout,
                })
            })
    }

    /// Cache performance statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Number of refreshes currently running
    pub fn refreshes_in_flight(&self) -> usize {
        self.inner.refresh.in_flight()
    }

    /// Manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    fn catalog(&self, catalog: &str) -> CredentialResult<Arc<CatalogProviders>> {
        self.inner
            .catalogs
            .get(catalog)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CredentialError::CatalogNotLoaded {
                catalog: catalog.to_string(),
            })
    }

    /// Spawn the refresh for `key` and wrap its handle for sharing.
    fn start_refresh(
        &self,
        key: CacheKey,
        owner: Arc<CatalogProviders>,
        provider: Arc<dyn CredentialProvider>,
    ) -> RefreshFuture {
        let inner = Arc::clone(&self.inner);
        let provider_name = key.provider.clone();

        let handle = tokio::spawn(async move {
            let finish_inner = Arc::clone(&inner);
            let finish_key = key.clone();
            // The slot must be cleared even if this task is dropped mid-refresh.
            let _finish = scopeguard::guard((), move |()| finish_inner.refresh.finish(&finish_key));
            inner.refresh_once(&key, &owner, provider.as_ref()).await
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(CredentialError::generation(
                    provider_name,
                    format!("refresh task failed: {e}"),
                ))
            })
        }
        .boxed()
        .shared()
    }
}

impl ManagerInner {
    async fn refresh_once(
        &self,
        key: &CacheKey,
        owner: &Arc<CatalogProviders>,
        provider: &dyn CredentialProvider,
    ) -> CredentialResult<Credential> {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(provider.get_credential(&key.scope))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(CredentialError::generation(
                    key.provider.as_str(),
                    "provider panicked",
                ))
            })
            .and_then(|credential| check_kind(provider, credential));
        let now = now_millis();
        let outcome = outcome.and_then(|credential| check_unexpired(provider, credential, now));
        let elapsed_ms = duration_millis(started.elapsed());

        match outcome {
            Ok(credential) => {
                self.cache.record_generation();
                let cached = self.store_if_current(key, owner, credential.clone(), now);
                debug!(
                    catalog = %key.catalog,
                    provider = %key.provider,
                    scope = %key.scope,
                    expire_time_ms = credential.expire_time_ms(),
                    elapsed_ms,
                    cached,
                    "Generated credential"
                );
                Ok(credential)
            }
            Err(err) => {
                self.cache.record_failure();
                let evicted = self.cache.evict_if_expired(key, now);
                warn!(
                    catalog = %key.catalog,
                    provider = %key.provider,
                    scope = %key.scope,
                    error = %err,
                    elapsed_ms,
                    evicted,
                    "Credential generation failed"
                );
                Err(as_generation_error(err, &key.provider))
            }
        }
    }

    /// Cache `credential` unless the catalog was unloaded or reloaded while
    /// it was being generated.
    ///
    /// Holds the catalog's map guard across the insert so an unload cannot
    /// purge in between; lock order is catalogs, then cache.
    fn store_if_current(
        &self,
        key: &CacheKey,
        owner: &Arc<CatalogProviders>,
        credential: Credential,
        now_ms: i64,
    ) -> bool {
        let Some(current) = self.catalogs.get(&key.catalog) else {
            return false;
        };
        if !Arc::ptr_eq(current.value(), owner) {
            return false;
        }
        self.cache
            .insert(key.clone(), credential, now_ms, self.config.safety_margin);
        true
    }
}

fn check_kind(
    provider: &dyn CredentialProvider,
    credential: Credential,
) -> CredentialResult<Credential> {
    if credential.credential_type() == provider.credential_type() {
        Ok(credential)
    } else {
        Err(CredentialError::generation(
            provider.name(),
            format!(
                "issued a '{}' credential, expected '{}'",
                credential.credential_type(),
                provider.credential_type()
            ),
        ))
    }
}

/// A credential already past its own expiry is a failed generation: it is
/// neither cached nor handed to waiters.
fn check_unexpired(
    provider: &dyn CredentialProvider,
    credential: Credential,
    now_ms: i64,
) -> CredentialResult<Credential> {
    if credential.is_expired_at(now_ms) {
        Err(CredentialError::generation(
            provider.name(),
            format!(
                "issued a credential that expired at {} (now {now_ms})",
                credential.expire_time_ms()
            ),
        ))
    } else {
        Ok(credential)
    }
}

fn as_generation_error(err: CredentialError, provider: &str) -> CredentialError {
    match err {
        err @ CredentialError::Generation { .. } => err,
        other => CredentialError::generation(provider, other.to_string()),
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.inner.config)
            .field("catalogs", &self.inner.catalogs.len())
            .field("cache", &self.inner.cache.stats())
            .finish_non_exhaustive()
    }
}

/// Type-level marker: no provider registry set yet
#[doc(hidden)]
pub struct NoRegistry;

/// Builder for [`CredentialManager`] with typestate pattern
///
/// A provider registry is required; `build` only exists once one is set.
///
/// ```
/// use keystone_credential::{CredentialManager, ProviderRegistry};
/// use std::time::Duration;
///
/// let manager = CredentialManager::builder()
///     .registry(ProviderRegistry::builtin())
///     .safety_margin(Duration::from_secs(60))
///     .max_entries(1_000)
///     .build();
/// assert_eq!(manager.config().max_entries, 1_000);
/// ```
pub struct CredentialManagerBuilder<R> {
    registry: R,
    config: ManagerConfig,
}

impl CredentialManagerBuilder<NoRegistry> {
    /// Create new builder instance
    pub fn new() -> Self {
        Self {
            registry: NoRegistry,
            config: ManagerConfig::default(),
        }
    }

    /// Set provider registry (required)
    pub fn registry(self, registry: ProviderRegistry) -> CredentialManagerBuilder<ProviderRegistry> {
        CredentialManagerBuilder {
            registry,
            config: self.config,
        }
    }
}

impl Default for CredentialManagerBuilder<NoRegistry> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> CredentialManagerBuilder<R> {
    /// Replace the whole configuration
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Refresh this long before expiry
    pub fn safety_margin(mut self, margin: Duration) -> Self {
        self.config.safety_margin = margin;
        self
    }

    /// Bound on waiting for an in-flight refresh
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    /// Maximum cached credentials
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = max_entries;
        self
    }
}

impl CredentialManagerBuilder<ProviderRegistry> {
    /// Build the CredentialManager instance
    pub fn build(self) -> CredentialManager {
        CredentialManager {
            inner: Arc::new(ManagerInner {
                cache: CredentialCache::new(self.config.max_entries),
                registry: self.registry,
                config: self.config,
                catalogs: DashMap::new(),
                refresh: RefreshCoordinator::default(),
            }),
        }
    }
}

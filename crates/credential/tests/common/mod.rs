//! Shared fixtures for the credential integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use keystone_credential::utils::time::now_millis;
use keystone_credential::{
    CatalogProperties, Credential, CredentialError, CredentialManager, CredentialProvider,
    CredentialResult, CredentialScope, GcsToken, ManagerConfig, ProviderRegistry,
};

pub const CATALOG: &str = "lake";

/// Install a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Provider issuing `gcs-token` credentials with a configurable delay,
/// lifetime and failure switch.
pub struct TestProvider {
    name: &'static str,
    calls: AtomicUsize,
    delay: Duration,
    lifetime: Duration,
    failing: AtomicBool,
    panicking: AtomicBool,
    stale: AtomicBool,
}

impl TestProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            lifetime: Duration::from_secs(3600),
            failing: AtomicBool::new(false),
            panicking: AtomicBool::new(false),
            stale: AtomicBool::new(false),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Issue credentials that expired a minute ago, as a skewed issuer would.
    pub fn set_stale(&self, stale: bool) {
        self.stale.store(stale, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialProvider for TestProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn credential_type(&self) -> &str {
        GcsToken::NAME
    }

    async fn get_credential(&self, _scope: &CredentialScope) -> CredentialResult<Credential> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        assert!(
            !self.panicking.load(Ordering::SeqCst),
            "provider blew up"
        );
        if self.failing.load(Ordering::SeqCst) {
            return Err(CredentialError::generation(self.name, "upstream unavailable"));
        }
        let expire = if self.stale.load(Ordering::SeqCst) {
            now_millis() - 60_000
        } else {
            now_millis() + i64::try_from(self.lifetime.as_millis()).unwrap()
        };
        Ok(GcsToken::credential(format!("{}-{n}", self.name), expire)?)
    }
}

/// Manager with `providers` registered under their names and loaded into
/// [`CATALOG`].
pub fn manager_with(providers: &[Arc<TestProvider>], config: ManagerConfig) -> CredentialManager {
    let mut registry = ProviderRegistry::new();
    let mut names = Vec::new();
    for provider in providers {
        let provider = Arc::clone(provider);
        names.push(provider.name);
        registry.register(provider.name, move |_| {
            Ok(Arc::clone(&provider) as Arc<dyn CredentialProvider>)
        });
    }

    let manager = CredentialManager::builder()
        .registry(registry)
        .config(config)
        .build();
    manager
        .load_catalog(
            CATALOG,
            &CatalogProperties::new().with("credential-providers", names.join(",")),
        )
        .unwrap();
    manager
}

/// Catalog properties for the built-in static S3 provider
pub fn s3_static_properties() -> CatalogProperties {
    CatalogProperties::new()
        .with("credential-providers", "s3-secret-key")
        .with("s3-access-key-id", "AKIAEXAMPLE")
        .with("s3-secret-access-key", "secret123")
}

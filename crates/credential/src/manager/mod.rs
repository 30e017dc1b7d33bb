//! Credential Manager - cached, single-flight access to catalog credentials.
//!
//! # Overview
//!
//! - **Catalog lifecycle**: `load_catalog` builds a catalog's providers from
//!   its properties, `unload_catalog` drops them and their cached credentials
//! - **Caching**: credentials are keyed by (catalog, provider, scope) and
//!   served until `expire - safety_margin`; non-expiring ones until unload
//! - **Single flight**: concurrent misses on one key share a single provider
//!   call; misses on different keys never wait for each other
//! - **Failure policy**: a failed refresh keeps a still-valid entry and evicts
//!   an expired one, so no credential is ever served past its expiry
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                CredentialManager (public API)            │
//! │  load_catalog · unload_catalog · get_credential · stats  │
//! └──────────────────────────────────────────────────────────┘
//!             │                   │                  │
//! ┌───────────▼─────┐  ┌──────────▼────────┐  ┌──────▼─────────────┐
//! │ ProviderRegistry│  │  CredentialCache  │  │ RefreshCoordinator │
//! │ (factories)     │  │  (DashMap, stats) │  │ (Shared futures)   │
//! └─────────────────┘  └───────────────────┘  └────────────────────┘
//!             │
//! ┌───────────▼──────────────────────────────────────────────┐
//! │                 CredentialProvider trait                 │
//! │      s3-secret-key · s3-token · azure-account-key · …    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Thread Safety
//!
//! [`CredentialManager`] is `Clone` and uses `Arc` internally. Refreshes run
//! on spawned tokio tasks, so `get_credential` must be called from within a
//! tokio runtime.

pub mod cache;
pub mod config;
#[allow(clippy::module_inception)]
pub mod manager;
mod refresh;

pub use cache::{CacheKey, CacheStats};
pub use config::ManagerConfig;
pub use manager::{CredentialManager, CredentialManagerBuilder, NoRegistry};

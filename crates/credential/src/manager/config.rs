//! Configuration types for the credential manager

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the credential manager
///
/// Durations use humantime notation when deserialized (`"5m"`, `"30s"`).
///
/// ```
/// use keystone_credential::ManagerConfig;
/// use std::time::Duration;
///
/// let config: ManagerConfig =
///     serde_json::from_str(r#"{"safety_margin": "1m", "max_entries": 100}"#).unwrap();
/// assert_eq!(config.safety_margin, Duration::from_secs(60));
/// assert_eq!(config.wait_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// How long before expiry a cached credential is refreshed.
    ///
    /// Capped per credential at half its remaining lifetime when issued.
    #[serde(with = "humantime_serde")]
    pub safety_margin: Duration,

    /// Longest a caller waits for an in-flight refresh
    #[serde(with = "humantime_serde")]
    pub wait_timeout: Duration,

    /// Maximum number of cached credentials
    pub max_entries: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(300), // 5 minutes
            wait_timeout: Duration::from_secs(30),
            max_entries: 10_000,
        }
    }
}

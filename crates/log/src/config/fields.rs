use serde::{Deserialize, Serialize};

/// Global fields recorded on the root span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fields {
    /// Service name
    pub service: Option<String>,
    /// Deployment environment
    pub env: Option<String>,
    /// Service version
    pub version: Option<String>,
    /// Instance id (host, pod)
    pub instance: Option<String>,
}

impl Fields {
    /// Read `KEYSTONE_SERVICE`, `KEYSTONE_ENV`, `KEYSTONE_VERSION`, `KEYSTONE_INSTANCE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            service: std::env::var("KEYSTONE_SERVICE").ok(),
            env: std::env::var("KEYSTONE_ENV").ok(),
            version: std::env::var("KEYSTONE_VERSION").ok(),
            instance: std::env::var("KEYSTONE_INSTANCE").ok(),
        }
    }

    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.service.is_none()
            && self.env.is_none()
            && self.version.is_none()
            && self.instance.is_none()
    }
}

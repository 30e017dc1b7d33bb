use serde::{Deserialize, Serialize};

/// Controls what each formatted record shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DisplayConfig {
    /// ANSI colors
    pub colors: bool,
    /// Timestamps
    pub time: bool,
    /// Event target (module path)
    pub target: bool,
    /// Source file and line
    pub source: bool,
    /// Thread ids
    pub thread_ids: bool,
    /// Thread names (useful for async listener workers)
    pub thread_names: bool,
    /// Flatten event fields into the top-level JSON object
    pub flatten: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            colors: true,
            time: true,
            target: true,
            source: false,
            thread_ids: false,
            thread_names: false,
            flatten: false,
        }
    }
}

impl DisplayConfig {
    /// Apply `KEYSTONE_LOG_COLORS` / `KEYSTONE_LOG_SOURCE` / `KEYSTONE_LOG_THREADS`.
    pub(crate) fn parse_env(&mut self) {
        if let Some(v) = env_flag("KEYSTONE_LOG_COLORS") {
            self.colors = v;
        }
        if let Some(v) = env_flag("KEYSTONE_LOG_SOURCE") {
            self.source = v;
        }
        if let Some(v) = env_flag("KEYSTONE_LOG_THREADS") {
            self.thread_names = v;
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

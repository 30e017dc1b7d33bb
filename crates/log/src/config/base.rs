//! The top-level logging configuration

use serde::{Deserialize, Serialize};

use super::{DisplayConfig, Fields};

/// Everything needed to install the global subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level filter (e.g., "info", "debug,keystone_credential=trace")
    pub level: String,

    /// How each record is rendered
    pub format: Format,

    /// Per-record decorations
    pub display: DisplayConfig,

    /// Global fields attached to every record through a root span
    pub fields: Fields,
}

/// Record layout written by the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Multi-line, for terminals
    Pretty,
    /// One line per record
    Compact,
    /// One JSON object per record
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Compact,
            display: DisplayConfig::default(),
            fields: Fields::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_partial_config_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"level":"debug","format":"json"}"#).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.display, DisplayConfig::default());
        assert!(config.fields.is_empty());
    }
}

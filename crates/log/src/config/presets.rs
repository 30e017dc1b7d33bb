//! Ready-made configurations

use super::{Config, DisplayConfig, Fields, Format};

impl Config {
    /// Read `KEYSTONE_LOG` (falling back to `RUST_LOG`), `KEYSTONE_LOG_FORMAT`
    /// and the display and field variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("KEYSTONE_LOG") {
            config.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            config.level = level;
        }

        if let Ok(format) = std::env::var("KEYSTONE_LOG_FORMAT") {
            config.format = parse_format(&format);
        }

        config.display.parse_env();
        config.fields = Fields::from_env();

        config
    }

    /// Debug level, pretty output with colors and source locations
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            display: DisplayConfig {
                colors: true,
                source: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Info level, flattened JSON with thread names and no colors
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            display: DisplayConfig {
                colors: false,
                source: false,
                thread_names: true,
                flatten: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }
}

fn parse_format(raw: &str) -> Format {
    match raw.to_lowercase().as_str() {
        "pretty" => Format::Pretty,
        "json" => Format::Json,
        _ => Format::Compact,
    }
}

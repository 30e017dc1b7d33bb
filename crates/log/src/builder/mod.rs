//! Subscriber assembly and installation

mod format;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::{LogError, LogResult};

/// Turns a [`Config`] into an installed global subscriber
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Returned by [`LoggerBuilder::build`]
///
/// Holds the root span carrying the global fields; dropping it exits the span.
#[derive(Debug)]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

impl LoggerBuilder {
    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Install the subscriber and enter the root span for global fields.
    ///
    /// # Errors
    ///
    /// [`LogError::Filter`] for an unparsable level directive and
    /// [`LogError::AlreadyInitialized`] when another subscriber is installed.
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {e}", self.config.level)))?;

        let fmt_layer = format::fmt_layer(self.config.format, &self.config.display);

        Registry::default()
            .with(fmt_layer)
            .with(filter)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        let root_span = if self.config.fields.is_empty() {
            None
        } else {
            let fields = &self.config.fields;
            let root = tracing::info_span!(
                "keystone",
                service = fields.service.as_deref().unwrap_or(""),
                env = fields.env.as_deref().unwrap_or(""),
                version = fields.version.as_deref().unwrap_or(""),
                instance = fields.instance.as_deref().unwrap_or("")
            );
            Some(root.entered())
        };

        Ok(LoggerGuard {
            _root_span: root_span,
        })
    }
}

//! Built-in `logging` listener: one structured `tracing` record per event.
//!
//! Records go to the `keystone::audit` target so they can be filtered or
//! routed separately from diagnostics. Event details are never written.

use std::collections::BTreeMap;

use tracing::Level;

use crate::error::{ListenerConfigError, ListenerError};
use crate::event::Event;
use crate::listener::EventListener;

/// Plugin name of [`LoggingListener`]
pub const LOGGING_PLUGIN: &str = "logging";

/// Target of audit records
pub const AUDIT_TARGET: &str = "keystone::audit";

const LEVEL: &str = "level";

macro_rules! audit_record {
    ($level:expr, $listener:expr, $event:expr) => {
        tracing::event!(
            target: AUDIT_TARGET,
            $level,
            listener = $listener,
            invocation_id = %$event.invocation_id(),
            user = $event.user(),
            identifier = %$event.identifier(),
            operation = %$event.operation_type(),
            phase = %$event.phase(),
            failure_kind = $event.failure().map(|f| f.kind()),
            failure = $event.failure().map(|f| f.message()),
            timestamp = %$event.timestamp(),
            "catalog operation event"
        )
    };
}

/// Writes every event as an audit record.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    name: String,
    level: Level,
}

impl LoggingListener {
    /// A listener logging at `INFO`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Level::INFO,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Build from plugin properties; `level` (trace..error) is optional.
    pub fn from_properties(
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Self, ListenerConfigError> {
        let listener = Self::new(name);
        match properties.get(LEVEL) {
            None => Ok(listener),
            Some(value) => value
                .parse::<Level>()
                .map(|level| listener.with_level(level))
                .map_err(|_| ListenerConfigError::InvalidProperty {
                    listener: name.to_string(),
                    key: LEVEL.to_string(),
                    reason: format!("unknown log level '{value}'"),
                }),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl EventListener for LoggingListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        let name = self.name.as_str();
        if self.level == Level::TRACE {
            audit_record!(Level::TRACE, name, event);
        } else if self.level == Level::DEBUG {
            audit_record!(Level::DEBUG, name, event);
        } else if self.level == Level::INFO {
            audit_record!(Level::INFO, name, event);
        } else if self.level == Level::WARN {
            audit_record!(Level::WARN, name, event);
        } else {
            audit_record!(Level::ERROR, name, event);
        }
        Ok(())
    }
}

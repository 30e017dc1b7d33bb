//! Bus configuration and property-driven listener setup.
//!
//! Listeners can be declared in a flat property map, typically loaded from the
//! server configuration:
//!
//! ```text
//! event-listener.names = audit, metrics
//! event-listener.audit.plugin = logging
//! event-listener.audit.mode = async-isolated
//! event-listener.audit.queue-capacity = 5000
//! event-listener.audit.level = debug
//! event-listener.metrics.mode = async-shared
//! ```
//!
//! `plugin` defaults to the listener name, `mode` to `sync` and
//! `queue-capacity` to [`BusConfig::default_queue_capacity`]. Every other
//! `event-listener.<name>.<key>` entry reaches the plugin factory as `<key>`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bus::EventBusBuilder;
use crate::error::ListenerConfigError;
use crate::listener::{DispatchMode, EventListener};
use crate::logging::{LOGGING_PLUGIN, LoggingListener};

/// Prefix of every listener property
pub const LISTENER_PREFIX: &str = "event-listener.";
/// Comma-separated list of configured listener names
pub const LISTENER_NAMES: &str = "event-listener.names";
/// Queue capacity used when a listener does not set its own
pub const DEFAULT_QUEUE_CAPACITY: usize = 3000;

const PLUGIN: &str = "plugin";
const MODE: &str = "mode";
const QUEUE_CAPACITY: &str = "queue-capacity";

/// Bus-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Capacity of a listener queue that does not set its own
    pub default_queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl BusConfig {
    pub fn validate(&self) -> Result<(), ListenerConfigError> {
        if self.default_queue_capacity == 0 {
            return Err(ListenerConfigError::ZeroDefaultQueueCapacity);
        }
        Ok(())
    }
}

/// One listener as declared in the property map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    pub name: String,
    /// Plugin factory building the listener
    pub plugin: String,
    pub mode: DispatchMode,
    /// `None` uses the bus default
    pub queue_capacity: Option<usize>,
    /// Plugin-specific properties, prefix stripped
    pub properties: BTreeMap<String, String>,
}

impl ListenerSpec {
    /// Read the listener declarations out of a property map.
    ///
    /// An absent or empty `event-listener.names` yields no listeners.
    pub fn parse_all(properties: &HashMap<String, String>) -> Result<Vec<Self>, ListenerConfigError> {
        let Some(names) = properties.get(LISTENER_NAMES) else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut specs = Vec::new();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !seen.insert(name) {
                return Err(ListenerConfigError::DuplicateListener {
                    name: name.to_string(),
                });
            }
            specs.push(Self::parse(name, properties)?);
        }
        Ok(specs)
    }

    fn parse(name: &str, properties: &HashMap<String, String>) -> Result<Self, ListenerConfigError> {
        let prefix = format!("{LISTENER_PREFIX}{name}.");
        let mut own: BTreeMap<String, String> = properties
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|key| (key.to_string(), value.trim().to_string()))
            })
            .collect();

        let plugin = match own.remove(PLUGIN) {
            Some(plugin) if plugin.is_empty() => {
                return Err(ListenerConfigError::InvalidProperty {
                    listener: name.to_string(),
                    key: PLUGIN.to_string(),
                    reason: "must not be blank".to_string(),
                });
            }
            Some(plugin) => plugin,
            None => name.to_string(),
        };

        let mode = own
            .remove(MODE)
            .map(|value| {
                value
                    .parse::<DispatchMode>()
                    .map_err(|value| ListenerConfigError::InvalidMode {
                        listener: name.to_string(),
                        value,
                    })
            })
            .transpose()?
            .unwrap_or_default();

        let queue_capacity = own
            .remove(QUEUE_CAPACITY)
            .map(|value| match value.parse::<usize>() {
                Ok(capacity) if capacity > 0 => Ok(capacity),
                _ => Err(ListenerConfigError::InvalidQueueCapacity {
                    listener: name.to_string(),
                    value,
                }),
            })
            .transpose()?;

        Ok(Self {
            name: name.to_string(),
            plugin,
            mode,
            queue_capacity,
            properties: own,
        })
    }
}

/// Builds a listener from its name and plugin properties.
pub type ListenerFactory = Arc<
    dyn Fn(&str, &BTreeMap<String, String>) -> Result<Arc<dyn EventListener>, ListenerConfigError>
        + Send
        + Sync,
>;

/// Listener plugins available to property-driven configuration.
#[derive(Clone, Default)]
pub struct ListenerPluginRegistry {
    factories: HashMap<String, ListenerFactory>,
}

impl ListenerPluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `logging` plugin.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(LOGGING_PLUGIN, |name, properties| {
            let listener = LoggingListener::from_properties(name, properties)?;
            Ok(Arc::new(listener) as Arc<dyn EventListener>)
        });
        registry
    }

    /// Register a plugin factory, replacing any factory of the same name.
    pub fn register<F>(&mut self, plugin: impl Into<String>, factory: F)
    where
        F: Fn(&str, &BTreeMap<String, String>) -> Result<Arc<dyn EventListener>, ListenerConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(plugin.into(), Arc::new(factory));
    }

    pub fn contains(&self, plugin: &str) -> bool {
        self.factories.contains_key(plugin)
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the listener a [`ListenerSpec`] describes.
    pub fn build(&self, spec: &ListenerSpec) -> Result<Arc<dyn EventListener>, ListenerConfigError> {
        let factory =
            self.factories
                .get(&spec.plugin)
                .ok_or_else(|| ListenerConfigError::UnknownPlugin {
                    listener: spec.name.clone(),
                    plugin: spec.plugin.clone(),
                })?;
        factory(&spec.name, &spec.properties)
    }
}

impl fmt::Debug for ListenerPluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerPluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

impl EventBusBuilder {
    /// Register every listener declared in `properties`.
    ///
    /// All declarations are resolved before any listener is registered, so a
    /// bad entry leaves the builder untouched.
    pub fn configure(
        self,
        properties: &HashMap<String, String>,
        plugins: &ListenerPluginRegistry,
    ) -> Result<Self, ListenerConfigError> {
        let specs = ListenerSpec::parse_all(properties)?;
        let mut resolved = Vec::with_capacity(specs.len());
        for spec in &specs {
            let listener = plugins.build(spec)?;
            debug!(
                listener = %spec.name,
                plugin = %spec.plugin,
                mode = %spec.mode,
                "configured event listener"
            );
            resolved.push((listener, spec.mode, spec.queue_capacity));
        }
        Ok(resolved
            .into_iter()
            .fold(self, |builder, (listener, mode, capacity)| {
                builder.register(listener, mode, capacity)
            }))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn props(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply() {
        let specs = ListenerSpec::parse_all(&props(&[(LISTENER_NAMES, "logging")])).unwrap();
        assert_eq!(
            specs,
            vec![ListenerSpec {
                name: "logging".into(),
                plugin: "logging".into(),
                mode: DispatchMode::Sync,
                queue_capacity: None,
                properties: BTreeMap::new(),
            }]
        );
    }

    #[test]
    fn reads_full_declaration() {
        let specs = ListenerSpec::parse_all(&props(&[
            (LISTENER_NAMES, " audit , "),
            ("event-listener.audit.plugin", "logging"),
            ("event-listener.audit.mode", "async-isolated"),
            ("event-listener.audit.queue-capacity", "5000"),
            ("event-listener.audit.level", "debug"),
            ("event-listener.other.level", "trace"),
        ]))
        .unwrap();

        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.plugin, "logging");
        assert_eq!(spec.mode, DispatchMode::AsyncIsolated);
        assert_eq!(spec.queue_capacity, Some(5000));
        assert_eq!(
            spec.properties,
            BTreeMap::from([("level".to_string(), "debug".to_string())])
        );
    }

    #[test]
    fn no_names_means_no_listeners() {
        assert!(ListenerSpec::parse_all(&HashMap::new()).unwrap().is_empty());
        assert!(
            ListenerSpec::parse_all(&props(&[(LISTENER_NAMES, " ")]))
                .unwrap()
                .is_empty()
        );
    }

    #[rstest]
    #[case::duplicate(
        &[(LISTENER_NAMES, "a,a")],
        ListenerConfigError::DuplicateListener { name: "a".into() }
    )]
    #[case::bad_mode(
        &[(LISTENER_NAMES, "a"), ("event-listener.a.mode", "later")],
        ListenerConfigError::InvalidMode { listener: "a".into(), value: "later".into() }
    )]
    #[case::zero_capacity(
        &[(LISTENER_NAMES, "a"), ("event-listener.a.queue-capacity", "0")],
        ListenerConfigError::InvalidQueueCapacity { listener: "a".into(), value: "0".into() }
    )]
    #[case::text_capacity(
        &[(LISTENER_NAMES, "a"), ("event-listener.a.queue-capacity", "lots")],
        ListenerConfigError::InvalidQueueCapacity { listener: "a".into(), value: "lots".into() }
    )]
    #[case::blank_plugin(
        &[(LISTENER_NAMES, "a"), ("event-listener.a.plugin", " ")],
        ListenerConfigError::InvalidProperty {
            listener: "a".into(),
            key: "plugin".into(),
            reason: "must not be blank".into(),
        }
    )]
    fn rejects_bad_declarations(
        #[case] entries: &[(&str, &str)],
        #[case] expected: ListenerConfigError,
    ) {
        assert_eq!(ListenerSpec::parse_all(&props(entries)).unwrap_err(), expected);
    }

    #[test]
    fn unknown_plugin_is_a_config_error() {
        let spec = ListenerSpec::parse_all(&props(&[(LISTENER_NAMES, "kafka")]))
            .unwrap()
            .remove(0);
        let error = ListenerPluginRegistry::builtin().build(&spec).err().unwrap();
        assert_eq!(
            error,
            ListenerConfigError::UnknownPlugin {
                listener: "kafka".into(),
                plugin: "kafka".into(),
            }
        );
    }

    #[test]
    fn builtin_registry_has_logging() {
        assert_eq!(ListenerPluginRegistry::builtin().names(), ["logging"]);
    }

    #[test]
    fn bus_config_deserializes_with_defaults() {
        let config: BusConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(
            BusConfig {
                default_queue_capacity: 0
            }
            .validate()
            .unwrap_err(),
            ListenerConfigError::ZeroDefaultQueueCapacity
        );
    }
}

//! Configure listeners from properties and audit a few catalog operations.
//!
//! Run with `cargo run -p keystone-eventbus --example audit_events`.

use std::collections::HashMap;

use keystone_core::{MetadataObject, MetadataObjectType, to_entity_ident};
use keystone_eventbus::{EventBus, FailureInfo, ListenerPluginRegistry, OperationType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = keystone_log::auto_init()?;

    let properties: HashMap<String, String> = [
        ("event-listener.names", "audit"),
        ("event-listener.audit.plugin", "logging"),
        ("event-listener.audit.mode", "async-isolated"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let bus = EventBus::builder()
        .configure(&properties, &ListenerPluginRegistry::builtin())?
        .build()?;

    let table = MetadataObject::new("hive.sales.orders", MetadataObjectType::Table)?;
    let ident = to_entity_ident("acme", &table)?;

    bus.begin("alice", ident.clone(), OperationType::LoadTable)?
        .succeed(None);
    bus.begin("alice", ident, OperationType::ListTagsInfoForMetadataObject)?
        .fail_with(FailureInfo::new("NoSuchMetadataObjectException", "no such table")?);

    bus.shutdown();
    println!("stats: {:?}", bus.stats());
    Ok(())
}

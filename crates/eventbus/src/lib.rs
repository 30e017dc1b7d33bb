//! # Keystone EventBus
//!
//! Audit events for catalog operations and a dispatcher that keeps listener
//! faults away from the operations that emit them.
//!
//! ## Key Components
//!
//! - **Event**: one immutable record type; [`OperationType`] says what was
//!   attempted, [`EventPhase`] whether it is about to run, succeeded or failed
//! - **EventListener**: plugin interface with `pre` / `success` / `failure`
//!   callbacks and `start` / `stop` hooks
//! - **EventBus**: fixed listener set, `sync`, `async-isolated` and
//!   `async-shared` dispatch, per-listener fault isolation
//! - **OperationScope**: guarantees one terminal event per pre event
//!
//! ## Usage
//!
//! ```rust
//! use keystone_core::{MetadataObject, MetadataObjectType, to_entity_ident};
//! use keystone_eventbus::{EventBus, EventPhase, LoggingListener, OperationType};
//!
//! let bus = EventBus::builder()
//!     .listener(LoggingListener::new("audit"))
//!     .build()
//!     .unwrap();
//!
//! let table = MetadataObject::new("hive.sales.orders", MetadataObjectType::Table).unwrap();
//! let ident = to_entity_ident("acme", &table).unwrap();
//!
//! let scope = bus.begin("alice", ident, OperationType::ListTagsInfoForMetadataObject).unwrap();
//! scope.succeed(None);
//!
//! assert_eq!(bus.stats().delivered, 2);
//! ```

#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
mod error;
pub mod event;
pub mod listener;
pub mod logging;
pub mod operation;
mod scope;

pub use bus::{DispatchStats, EventBus, EventBusBuilder};
pub use config::{BusConfig, ListenerFactory, ListenerPluginRegistry, ListenerSpec};
pub use error::{EventError, ListenerConfigError, ListenerError};
pub use event::{Event, EventPhase, FailureInfo};
pub use listener::{DispatchMode, EventListener};
pub use logging::LoggingListener;
pub use operation::OperationType;
pub use scope::OperationScope;

/// Commonly used types and traits
pub mod prelude {
    pub use crate::{
        DispatchMode, Event, EventBus, EventListener, EventPhase, FailureInfo, ListenerError,
        OperationType,
    };
}

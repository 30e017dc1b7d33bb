//! Shared listeners for event bus integration tests.
#![allow(dead_code)]

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use keystone_core::{MetadataObject, MetadataObjectType, NameIdentifier, to_entity_ident};
use keystone_eventbus::{Event, EventListener, ListenerError};

/// Install a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn orders_table() -> NameIdentifier {
    let table = MetadataObject::new("hive.sales.orders", MetadataObjectType::Table).unwrap();
    to_entity_ident("acme", &table).unwrap()
}

/// Keeps every event it sees, in arrival order.
#[derive(Clone)]
pub struct Recorder {
    name: String,
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl EventListener for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Fails every callback.
pub struct Failing(pub &'static str);

impl EventListener for Failing {
    fn name(&self) -> &str {
        self.0
    }

    fn on_event(&self, _event: &Event) -> Result<(), ListenerError> {
        Err(ListenerError::failed("downstream sink rejected the event"))
    }
}

/// Panics on every callback.
pub struct Panicking(pub &'static str);

impl EventListener for Panicking {
    fn name(&self) -> &str {
        self.0
    }

    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        panic!("listener bug on {}", event.operation_type())
    }
}

/// Blocks inside its first callback until released.
pub struct Gate {
    name: &'static str,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
    seen: Arc<Mutex<usize>>,
}

/// Test-side handles of a [`Gate`].
pub struct GateHandle {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
    pub seen: Arc<Mutex<usize>>,
}

impl Gate {
    pub fn new(name: &'static str) -> (Self, GateHandle) {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let seen = Arc::new(Mutex::new(0));
        let gate = Self {
            name,
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            seen: Arc::clone(&seen),
        };
        let handle = GateHandle {
            entered: entered_rx,
            release: release_tx,
            seen,
        };
        (gate, handle)
    }
}

impl EventListener for Gate {
    fn name(&self) -> &str {
        self.name
    }

    fn on_event(&self, _event: &Event) -> Result<(), ListenerError> {
        let first = {
            let mut seen = self.seen.lock().unwrap();
            *seen += 1;
            *seen == 1
        };
        if first {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
        }
        Ok(())
    }
}

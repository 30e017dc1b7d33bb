//! Event bus: fans catalog events out to registered listeners.
//!
//! Listeners are registered on an [`EventBusBuilder`]; the built [`EventBus`]
//! has a fixed listener set. Each listener is reached through one of three
//! dispatch modes:
//!
//! ```text
//!                  ┌── sync ────────────► listener (emitting thread)
//!  emit(event) ────┼── async-isolated ──► [queue] ─► worker ─► listener
//!                  └── async-shared ────► [queue] ─► worker ─► listener, listener, ...
//! ```
//!
//! Listener errors and panics are contained, logged and counted. A full
//! queue drops the event for that queue only.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, error, info, trace, warn};

use crate::config::BusConfig;
use crate::error::{ListenerConfigError, ListenerError};
use crate::event::Event;
use crate::listener::{DispatchMode, EventListener};

/// Name of the queue shared by all `async-shared` listeners
pub const SHARED_QUEUE: &str = "shared";

/// Snapshot of dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Events accepted by [`EventBus::emit`]
    pub emitted: u64,
    /// Successful listener invocations
    pub delivered: u64,
    /// Listener invocations that returned an error or panicked
    pub listener_failures: u64,
    /// Events dropped by a full or closed queue, counted per queue
    pub dropped: u64,
    /// The share of `dropped` that were success or failure events; each one
    /// leaves a listener with a pre event it never sees closed
    pub dropped_terminal: u64,
}

#[derive(Default)]
struct Counters {
    emitted: AtomicU64,
    delivered: AtomicU64,
    listener_failures: AtomicU64,
    dropped: AtomicU64,
    dropped_terminal: AtomicU64,
}

struct Registration {
    listener: Arc<dyn EventListener>,
    mode: DispatchMode,
    queue_capacity: Option<usize>,
}

/// Collects listeners before the bus is built.
///
/// # Examples
///
/// ```
/// use keystone_eventbus::{EventBus, LoggingListener};
///
/// let bus = EventBus::builder()
///     .listener(LoggingListener::new("audit-log"))
///     .build()
///     .unwrap();
///
/// assert_eq!(bus.listener_names(), ["audit-log"]);
/// bus.shutdown();
/// ```
#[derive(Default)]
pub struct EventBusBuilder {
    config: BusConfig,
    registrations: Vec<Registration>,
}

impl EventBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a `sync` listener.
    pub fn listener(self, listener: impl EventListener) -> Self {
        self.register(Arc::new(listener), DispatchMode::Sync, None)
    }

    /// Register a listener with an explicit dispatch mode.
    pub fn listener_with_mode(self, listener: impl EventListener, mode: DispatchMode) -> Self {
        self.register(Arc::new(listener), mode, None)
    }

    /// Register a shared listener handle.
    ///
    /// `queue_capacity` overrides [`BusConfig::default_queue_capacity`] for
    /// the listener's queue; it is ignored in `sync` mode.
    pub fn register(
        mut self,
        listener: Arc<dyn EventListener>,
        mode: DispatchMode,
        queue_capacity: Option<usize>,
    ) -> Self {
        self.registrations.push(Registration {
            listener,
            mode,
            queue_capacity,
        });
        self
    }

    /// Start every listener and spin up the queue workers.
    ///
    /// Listeners start in registration order; if one fails, those already
    /// started are stopped again and the error is returned.
    pub fn build(self) -> Result<EventBus, ListenerConfigError> {
        let Self {
            config,
            registrations,
        } = self;
        config.validate()?;
        check_registrations(&registrations)?;
        start_all(&registrations)?;

        let counters = Arc::new(Counters::default());
        let listeners: Vec<_> = registrations
            .iter()
            .map(|r| Arc::clone(&r.listener))
            .collect();
        let shared_capacity = registrations
            .iter()
            .filter(|r| r.mode == DispatchMode::AsyncShared)
            .filter_map(|r| r.queue_capacity)
            .max()
            .unwrap_or(config.default_queue_capacity);

        let mut sinks = Vec::with_capacity(registrations.len());
        let mut pending: Vec<PendingWorker> = Vec::new();
        let mut shared: Option<usize> = None;

        for Registration {
            listener,
            mode,
            queue_capacity,
        } in registrations
        {
            match mode {
                DispatchMode::Sync => sinks.push(Sink::Inline(listener)),
                DispatchMode::AsyncIsolated => {
                    let capacity = queue_capacity.unwrap_or(config.default_queue_capacity);
                    let (queue, receiver) = Queue::new(listener.name(), capacity);
                    sinks.push(Sink::Queued(Arc::clone(&queue)));
                    pending.push(PendingWorker {
                        queue: queue.name.clone(),
                        receiver,
                        listeners: vec![listener],
                    });
                }
                DispatchMode::AsyncShared => {
                    if let Some(index) = shared {
                        if let Some(worker) = pending.get_mut(index) {
                            worker.listeners.push(listener);
                        }
                    } else {
                        let (queue, receiver) = Queue::new(SHARED_QUEUE, shared_capacity);
                        sinks.push(Sink::Queued(Arc::clone(&queue)));
                        shared = Some(pending.len());
                        pending.push(PendingWorker {
                            queue: queue.name.clone(),
                            receiver,
                            listeners: vec![listener],
                        });
                    }
                }
            }
        }

        let bus = EventBus {
            sinks,
            listeners,
            workers: Mutex::new(Vec::with_capacity(pending.len())),
            counters,
            closed: AtomicBool::new(false),
        };

        let mut pending = pending.into_iter();
        while let Some(worker) = pending.next() {
            let queue = worker.queue.clone();
            let members = worker.listeners.clone();
            match worker.spawn(Arc::clone(&bus.counters)) {
                Ok(handle) => bus.workers.lock().push(handle),
                Err(e) => {
                    let unspawned = members
                        .iter()
                        .chain(pending.as_slice().iter().flat_map(|w| &w.listeners));
                    for listener in unspawned {
                        stop_listener(listener.as_ref());
                    }
                    bus.shutdown();
                    return Err(ListenerConfigError::SpawnFailed {
                        queue,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            listeners = bus.listener_names().len(),
            queues = bus.workers.lock().len(),
            "event bus started"
        );
        Ok(bus)
    }
}

fn check_registrations(registrations: &[Registration]) -> Result<(), ListenerConfigError> {
    let mut names = HashSet::new();
    for registration in registrations {
        let name = registration.listener.name();
        if !names.insert(name) {
            return Err(ListenerConfigError::DuplicateListener {
                name: name.to_string(),
            });
        }
        if registration.mode.is_async() && registration.queue_capacity == Some(0) {
            return Err(ListenerConfigError::InvalidQueueCapacity {
                listener: name.to_string(),
                value: "0".to_string(),
            });
        }
    }
    Ok(())
}

fn start_all(registrations: &[Registration]) -> Result<(), ListenerConfigError> {
    for (index, registration) in registrations.iter().enumerate() {
        let listener = &registration.listener;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.start()))
            .unwrap_or_else(|payload| Err(ListenerError::Panicked(panic_message(&*payload))));
        if let Err(e) = outcome {
            for started in registrations[..index].iter().rev() {
                stop_listener(started.listener.as_ref());
            }
            return Err(ListenerConfigError::StartFailed {
                listener: listener.name().to_string(),
                reason: e.to_string(),
            });
        }
        debug!(
            listener = listener.name(),
            mode = %registration.mode,
            "event listener started"
        );
    }
    Ok(())
}

enum Sink {
    Inline(Arc<dyn EventListener>),
    Queued(Arc<Queue>),
}

struct Queue {
    name: String,
    sender: RwLock<Option<Sender<Arc<Event>>>>,
}

impl Queue {
    fn new(name: &str, capacity: usize) -> (Arc<Self>, Receiver<Arc<Event>>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let queue = Self {
            name: name.to_string(),
            sender: RwLock::new(Some(sender)),
        };
        (Arc::new(queue), receiver)
    }
}

struct PendingWorker {
    queue: String,
    receiver: Receiver<Arc<Event>>,
    listeners: Vec<Arc<dyn EventListener>>,
}

impl PendingWorker {
    fn spawn(self, counters: Arc<Counters>) -> std::io::Result<JoinHandle<()>> {
        let Self {
            queue,
            mut receiver,
            listeners,
        } = self;
        thread::Builder::new()
            .name(format!("keystone-events-{queue}"))
            .spawn(move || {
                while let Some(event) = receiver.blocking_recv() {
                    for listener in &listeners {
                        deliver(listener.as_ref(), &event, &counters);
                    }
                }
                for listener in &listeners {
                    stop_listener(listener.as_ref());
                }
                debug!(queue = %queue, "event queue drained");
            })
    }
}

/// Process-wide event dispatcher.
///
/// Share it by handle (`Arc<EventBus>`). Dropping the bus shuts it down.
pub struct EventBus {
    sinks: Vec<Sink>,
    listeners: Vec<Arc<dyn EventListener>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    closed: AtomicBool,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Deliver `event` to every listener.
    ///
    /// Never fails and never blocks on a listener queue. After
    /// [`shutdown`](Self::shutdown) events are discarded.
    pub fn emit(&self, event: Event) {
        if self.closed.load(Ordering::Acquire) {
            debug!(
                operation = %event.operation_type(),
                phase = %event.phase(),
                "event bus is shut down; event discarded"
            );
            return;
        }
        self.counters.emitted.fetch_add(1, Ordering::Relaxed);
        trace!(
            operation = %event.operation_type(),
            phase = %event.phase(),
            identifier = %event.identifier(),
            "emitting event"
        );

        let event = Arc::new(event);
        for sink in &self.sinks {
            match sink {
                Sink::Inline(listener) => deliver(listener.as_ref(), &event, &self.counters),
                Sink::Queued(queue) => self.enqueue(queue, &event),
            }
        }
    }

    fn enqueue(&self, queue: &Queue, event: &Arc<Event>) {
        let sender = queue.sender.read();
        let Some(sender) = sender.as_ref() else {
            self.record_drop(queue, event, "event queue is closed; event dropped");
            return;
        };
        match sender.try_send(Arc::clone(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.record_drop(queue, event, "event queue full; event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                self.record_drop(queue, event, "event queue worker is gone; event dropped");
            }
        }
    }

    fn record_drop(&self, queue: &Queue, event: &Event, message: &str) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        if event.is_terminal() {
            self.counters.dropped_terminal.fetch_add(1, Ordering::Relaxed);
            error!(
                queue = %queue.name,
                operation = %event.operation_type(),
                phase = %event.phase(),
                invocation_id = %event.invocation_id(),
                "{message}; its pre event stays unclosed"
            );
        } else {
            warn!(
                queue = %queue.name,
                operation = %event.operation_type(),
                phase = %event.phase(),
                "{message}"
            );
        }
    }

    /// Current dispatch counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            emitted: self.counters.emitted.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            listener_failures: self.counters.listener_failures.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            dropped_terminal: self.counters.dropped_terminal.load(Ordering::Relaxed),
        }
    }

    /// Names of all listeners, in registration order.
    pub fn listener_names(&self) -> Vec<&str> {
        self.listeners.iter().map(|listener| listener.name()).collect()
    }

    /// Events waiting in listener queues.
    pub fn queued(&self) -> usize {
        self.sinks
            .iter()
            .filter_map(|sink| match sink {
                Sink::Queued(queue) => queue
                    .sender
                    .read()
                    .as_ref()
                    .map(|sender| sender.max_capacity() - sender.capacity()),
                Sink::Inline(_) => None,
            })
            .sum()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the queues, let the workers drain them, join the workers and
    /// stop every listener. Idempotent.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for sink in &self.sinks {
            if let Sink::Queued(queue) = sink {
                queue.sender.write().take();
            }
        }
        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for worker in workers {
            // A listener may release the last handle on its own worker; that
            // worker finishes draining after this returns.
            if worker.thread().id() == current {
                debug!("event bus released on its own worker; not joining it");
                continue;
            }
            let name = worker.thread().name().unwrap_or("event-worker").to_string();
            if worker.join().is_err() {
                error!(worker = %name, "event worker panicked during shutdown");
            }
        }
        for sink in &self.sinks {
            if let Sink::Inline(listener) = sink {
                stop_listener(listener.as_ref());
            }
        }
        let stats = self.stats();
        info!(
            emitted = stats.emitted,
            delivered = stats.delivered,
            listener_failures = stats.listener_failures,
            dropped = stats.dropped,
            dropped_terminal = stats.dropped_terminal,
            "event bus shut down"
        );
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_names())
            .field("stats", &self.stats())
            .field("closed", &self.is_shut_down())
            .finish()
    }
}

fn deliver(listener: &dyn EventListener, event: &Event, counters: &Counters) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)))
        .unwrap_or_else(|payload| Err(ListenerError::Panicked(panic_message(&*payload))));
    match outcome {
        Ok(()) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            counters.listener_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                listener = listener.name(),
                operation = %event.operation_type(),
                phase = %event.phase(),
                invocation_id = %event.invocation_id(),
                error = %e,
                "event listener failed"
            );
        }
    }
}

fn stop_listener(listener: &dyn EventListener) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener.stop())) {
        error!(
            listener = listener.name(),
            panic = %panic_message(&*payload),
            "event listener panicked while stopping"
        );
    } else {
        debug!(listener = listener.name(), "event listener stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use keystone_core::NameIdentifier;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::operation::OperationType;

    struct Lifecycle {
        name: &'static str,
        fail_start: bool,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    impl Lifecycle {
        fn new(name: &'static str, started: &Arc<AtomicUsize>, stopped: &Arc<AtomicUsize>) -> Self {
            Self {
                name,
                fail_start: false,
                started: Arc::clone(started),
                stopped: Arc::clone(stopped),
            }
        }
    }

    impl EventListener for Lifecycle {
        fn name(&self) -> &str {
            self.name
        }

        fn start(&self) -> Result<(), ListenerError> {
            if self.fail_start {
                return Err(ListenerError::failed("sink unreachable"));
            }
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event() -> Event {
        let ident = NameIdentifier::of(["acme"]).unwrap();
        Event::pre("alice", ident, OperationType::LoadMetalake).unwrap()
    }

    #[test]
    fn failed_start_stops_listeners_already_started() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let broken = Lifecycle {
            fail_start: true,
            ..Lifecycle::new("broken", &started, &stopped)
        };

        let error = EventBus::builder()
            .listener(Lifecycle::new("first", &started, &stopped))
            .listener(broken)
            .listener(Lifecycle::new("never", &started, &stopped))
            .build()
            .unwrap_err();

        assert_eq!(
            error,
            ListenerConfigError::StartFailed {
                listener: "broken".into(),
                reason: "sink unreachable".into(),
            }
        );
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let error = EventBus::builder()
            .listener(Lifecycle::new("audit", &started, &stopped))
            .listener_with_mode(
                Lifecycle::new("audit", &started, &stopped),
                DispatchMode::AsyncShared,
            )
            .build()
            .unwrap_err();

        assert_eq!(
            error,
            ListenerConfigError::DuplicateListener {
                name: "audit".into()
            }
        );
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn shutdown_stops_each_listener_once_and_discards_later_events() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::builder()
            .listener(Lifecycle::new("inline", &started, &stopped))
            .listener_with_mode(
                Lifecycle::new("isolated", &started, &stopped),
                DispatchMode::AsyncIsolated,
            )
            .listener_with_mode(
                Lifecycle::new("shared", &started, &stopped),
                DispatchMode::AsyncShared,
            )
            .build()
            .unwrap();
        assert_eq!(bus.listener_names(), ["inline", "isolated", "shared"]);
        assert_eq!(started.load(Ordering::SeqCst), 3);

        bus.emit(event());
        bus.shutdown();
        bus.shutdown();
        bus.emit(event());

        assert!(bus.is_shut_down());
        assert_eq!(stopped.load(Ordering::SeqCst), 3);
        assert_eq!(
            bus.stats(),
            DispatchStats {
                emitted: 1,
                delivered: 3,
                listener_failures: 0,
                dropped: 0,
                dropped_terminal: 0,
            }
        );
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let error = EventBus::builder()
            .register(
                Arc::new(Lifecycle::new("isolated", &started, &stopped)),
                DispatchMode::AsyncIsolated,
                Some(0),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            error,
            ListenerConfigError::InvalidQueueCapacity {
                listener: "isolated".into(),
                value: "0".into(),
            }
        );
    }

    /// Holds a bus handle and releases it from inside its own worker.
    struct LastHolder {
        bus: Mutex<Option<Arc<EventBus>>>,
        go: Mutex<std::sync::mpsc::Receiver<()>>,
        released: Mutex<std::sync::mpsc::Sender<()>>,
    }

    impl EventListener for LastHolder {
        fn name(&self) -> &str {
            "last-holder"
        }

        fn on_event(&self, _event: &Event) -> Result<(), ListenerError> {
            let bus = self.bus.lock().take();
            let _ = self.go.lock().recv_timeout(std::time::Duration::from_secs(5));
            drop(bus);
            let _ = self.released.lock().send(());
            Ok(())
        }
    }

    #[test]
    fn releasing_the_last_handle_on_a_worker_does_not_join_itself() {
        let (go_tx, go_rx) = std::sync::mpsc::channel();
        let (released_tx, released_rx) = std::sync::mpsc::channel();
        let holder = Arc::new(LastHolder {
            bus: Mutex::new(None),
            go: Mutex::new(go_rx),
            released: Mutex::new(released_tx),
        });
        let bus = Arc::new(
            EventBus::builder()
                .register(
                    Arc::clone(&holder) as Arc<dyn EventListener>,
                    DispatchMode::AsyncIsolated,
                    None,
                )
                .build()
                .unwrap(),
        );
        *holder.bus.lock() = Some(Arc::clone(&bus));

        bus.emit(event());
        drop(bus);
        go_tx.send(()).unwrap();

        released_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("worker should finish dropping the bus");
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}

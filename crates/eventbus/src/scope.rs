//! Pairing pre events with exactly one terminal event.

use std::future::Future;

use keystone_core::NameIdentifier;
use serde_json::Value;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::error::EventError;
use crate::event::{Event, EventPhase, FailureInfo};
use crate::operation::OperationType;

/// An operation whose pre event has been emitted.
///
/// Consume it with [`succeed`](Self::succeed) or [`fail`](Self::fail). If it
/// is dropped first (early return, panic, cancelled future), a failure event
/// of kind [`FailureInfo::ABANDONED`] closes the invocation instead.
#[must_use = "dropping the scope reports the operation as abandoned"]
#[derive(Debug)]
pub struct OperationScope<'bus> {
    bus: &'bus EventBus,
    pre: Option<Event>,
}

impl OperationScope<'_> {
    /// Invocation shared by the pre and terminal events.
    pub fn invocation_id(&self) -> Option<Uuid> {
        self.pre.as_ref().map(Event::invocation_id)
    }

    /// Report success, with optional result details.
    pub fn succeed(mut self, details: Option<Value>) {
        if let Some(pre) = self.pre.take() {
            self.bus.emit(pre.succeeded(details));
        }
    }

    /// Report failure caused by `error`.
    pub fn fail<E>(self, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        self.fail_with(FailureInfo::from_error(error));
    }

    pub fn fail_with(mut self, failure: FailureInfo) {
        if let Some(pre) = self.pre.take() {
            self.bus.emit(pre.failed(failure));
        }
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        if let Some(pre) = self.pre.take() {
            tracing::debug!(
                operation = %pre.operation_type(),
                invocation_id = %pre.invocation_id(),
                "operation scope dropped without an outcome"
            );
            self.bus.emit(pre.failed(FailureInfo::abandoned()));
        }
    }
}

impl EventBus {
    /// Emit the pre event of a new invocation.
    ///
    /// # Examples
    ///
    /// ```
    /// use keystone_core::NameIdentifier;
    /// use keystone_eventbus::{EventBus, OperationType};
    ///
    /// let bus = EventBus::builder().build().unwrap();
    /// let ident = NameIdentifier::of(["acme", "hive"]).unwrap();
    ///
    /// let scope = bus.begin("alice", ident, OperationType::LoadCatalog).unwrap();
    /// scope.succeed(None);
    /// assert_eq!(bus.stats().emitted, 2);
    /// ```
    pub fn begin(
        &self,
        user: impl Into<String>,
        identifier: NameIdentifier,
        operation: OperationType,
    ) -> Result<OperationScope<'_>, EventError> {
        self.begin_event(Event::pre(user, identifier, operation)?)
    }

    /// Emit a prepared pre event (for example one carrying request details).
    pub fn begin_event(&self, pre: Event) -> Result<OperationScope<'_>, EventError> {
        if pre.phase() != EventPhase::Pre {
            return Err(EventError::UnexpectedPhase {
                expected: EventPhase::Pre,
                actual: pre.phase(),
            });
        }
        self.emit(pre.clone());
        Ok(OperationScope {
            bus: self,
            pre: Some(pre),
        })
    }

    /// Run `operation` between a pre event and its terminal event.
    ///
    /// The outer `Err` means the event could not be built and the operation
    /// never ran; the inner result is the operation's own, unchanged.
    pub async fn observe<F, T, E>(
        &self,
        user: impl Into<String>,
        identifier: NameIdentifier,
        operation: OperationType,
        future: F,
    ) -> Result<Result<T, E>, EventError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let scope = self.begin(user, identifier, operation)?;
        let outcome = future.await;
        match &outcome {
            Ok(_) => scope.succeed(None),
            Err(e) => scope.fail(e),
        }
        Ok(outcome)
    }
}

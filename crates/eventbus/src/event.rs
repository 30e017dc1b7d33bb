//! Catalog operation events.
//!
//! One [`Event`] type covers every operation: the [`OperationType`] says what
//! was attempted and the [`EventPhase`] says where in its lifecycle the event
//! was emitted. Failure information is present exactly on
//! [`EventPhase::PostFailure`] events; the constructors keep it that way.

use std::fmt;

use chrono::{DateTime, Utc};
use keystone_core::NameIdentifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::EventError;
use crate::operation::OperationType;

/// Lifecycle position of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPhase {
    /// Emitted before the operation's side effects
    Pre,
    /// The operation completed
    PostSuccess,
    /// The operation failed
    PostFailure,
}

impl EventPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "PRE",
            Self::PostSuccess => "POST_SUCCESS",
            Self::PostFailure => "POST_FAILURE",
        }
    }

    /// Whether this phase ends an invocation.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pre)
    }
}

impl fmt::Display for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    kind: String,
    message: String,
}

impl FailureInfo {
    /// Kind reported by scopes dropped without an outcome.
    pub const ABANDONED: &'static str = "Abandoned";

    /// Build failure info from an error kind and message.
    ///
    /// # Errors
    ///
    /// [`EventError::BlankFailureKind`] if `kind` is blank.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Result<Self, EventError> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(EventError::BlankFailureKind);
        }
        Ok(Self {
            kind,
            message: message.into(),
        })
    }

    /// Describe an error: its type's short name becomes the kind and its
    /// `Display` output the message.
    ///
    /// ```
    /// use keystone_eventbus::FailureInfo;
    ///
    /// let error = "x".parse::<u32>().unwrap_err();
    /// let failure = FailureInfo::from_error(&error);
    /// assert_eq!(failure.kind(), "ParseIntError");
    /// ```
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self {
            kind: short_type_name::<E>().to_string(),
            message: error.to_string(),
        }
    }

    /// The outcome of an operation that ended without reporting one.
    pub fn abandoned() -> Self {
        Self {
            kind: Self::ABANDONED.to_string(),
            message: "operation ended without reporting an outcome".to_string(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Trait objects name their principal trait first, then `+ Send + Sync`.
    let principal = full.split(" + ").next().unwrap_or(full);
    if principal.trim_start_matches(['(', '&']).starts_with("dyn ") {
        return "Error";
    }
    let path = principal.split('<').next().unwrap_or(principal);
    match path.rsplit("::").next() {
        Some(short) if !short.trim().is_empty() => short,
        _ => "Error",
    }
}

/// An immutable record of one phase of one catalog operation.
///
/// # Examples
///
/// ```
/// use keystone_core::NameIdentifier;
/// use keystone_eventbus::{Event, EventPhase, OperationType};
///
/// let ident = NameIdentifier::of(["acme", "hive", "sales"]).unwrap();
/// let pre = Event::pre("alice", ident, OperationType::LoadSchema).unwrap();
/// let done = pre.succeeded(None);
///
/// assert_eq!(done.phase(), EventPhase::PostSuccess);
/// assert_eq!(done.invocation_id(), pre.invocation_id());
/// assert!(done.failure().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    user: String,
    identifier: NameIdentifier,
    operation_type: OperationType,
    phase: EventPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    timestamp: DateTime<Utc>,
    invocation_id: Uuid,
}

impl Event {
    fn build(
        user: impl Into<String>,
        identifier: NameIdentifier,
        operation_type: OperationType,
        phase: EventPhase,
        failure: Option<FailureInfo>,
    ) -> Result<Self, EventError> {
        let user = user.into();
        if user.trim().is_empty() {
            return Err(EventError::BlankUser);
        }
        Ok(Self {
            user,
            identifier,
            operation_type,
            phase,
            failure,
            details: None,
            timestamp: Utc::now(),
            invocation_id: Uuid::new_v4(),
        })
    }

    /// An event emitted before the operation runs.
    pub fn pre(
        user: impl Into<String>,
        identifier: NameIdentifier,
        operation_type: OperationType,
    ) -> Result<Self, EventError> {
        Self::build(user, identifier, operation_type, EventPhase::Pre, None)
    }

    /// An event reporting a completed operation.
    pub fn success(
        user: impl Into<String>,
        identifier: NameIdentifier,
        operation_type: OperationType,
    ) -> Result<Self, EventError> {
        Self::build(user, identifier, operation_type, EventPhase::PostSuccess, None)
    }

    /// An event reporting a failed operation.
    pub fn post_failure(
        user: impl Into<String>,
        identifier: NameIdentifier,
        operation_type: OperationType,
        failure: FailureInfo,
    ) -> Result<Self, EventError> {
        Self::build(
            user,
            identifier,
            operation_type,
            EventPhase::PostFailure,
            Some(failure),
        )
    }

    /// Attach operation-specific details: request data on a pre event,
    /// result data on a success event.
    ///
    /// Failure events never carry details; on them this is a no-op.
    pub fn with_details(mut self, details: Value) -> Self {
        if self.phase != EventPhase::PostFailure {
            self.details = Some(details);
        }
        self
    }

    /// Correlate this event with an existing invocation.
    pub fn with_invocation_id(mut self, invocation_id: Uuid) -> Self {
        self.invocation_id = invocation_id;
        self
    }

    /// The success event closing this event's invocation.
    pub fn succeeded(&self, details: Option<Value>) -> Self {
        self.terminal(EventPhase::PostSuccess, None, details)
    }

    /// The failure event closing this event's invocation.
    pub fn failed(&self, failure: FailureInfo) -> Self {
        self.terminal(EventPhase::PostFailure, Some(failure), None)
    }

    fn terminal(
        &self,
        phase: EventPhase,
        failure: Option<FailureInfo>,
        details: Option<Value>,
    ) -> Self {
        Self {
            user: self.user.clone(),
            identifier: self.identifier.clone(),
            operation_type: self.operation_type,
            phase,
            failure,
            details,
            timestamp: Utc::now(),
            invocation_id: self.invocation_id,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn identifier(&self) -> &NameIdentifier {
        &self.identifier
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// Present exactly on [`EventPhase::PostFailure`] events.
    pub fn failure(&self) -> Option<&FailureInfo> {
        self.failure.as_ref()
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// When the event was built.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Shared by the pre event and the terminal event of one invocation.
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

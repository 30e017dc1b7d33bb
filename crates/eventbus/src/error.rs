//! Error types for events, listeners and listener configuration.

use thiserror::Error;

use crate::event::EventPhase;

/// An event could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Every event names the user who initiated the operation.
    #[error("event user must not be blank")]
    BlankUser,

    /// Failure events carry a non-blank error kind.
    #[error("failure kind must not be blank")]
    BlankFailureKind,

    /// A wire name or code that no operation type carries.
    #[error("unknown operation type '{0}'")]
    UnknownOperationType(String),

    /// An event in the wrong phase was handed to an operation scope.
    #[error("expected a {expected} event, got {actual}")]
    UnexpectedPhase {
        /// Phase the caller had to supply
        expected: EventPhase,
        /// Phase of the event actually supplied
        actual: EventPhase,
    },
}

/// A listener failed to handle an event.
///
/// Captured and logged by the dispatcher; never reaches the operation that
/// emitted the event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// The listener reported a failure
    #[error("{0}")]
    Failed(String),

    /// The listener panicked
    #[error("listener panicked: {0}")]
    Panicked(String),
}

impl ListenerError {
    /// Shorthand for [`ListenerError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// The listener set could not be configured or started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerConfigError {
    #[error("listener '{name}' is registered more than once")]
    DuplicateListener { name: String },

    #[error("listener '{listener}': unknown plugin '{plugin}'")]
    UnknownPlugin { listener: String, plugin: String },

    #[error(
        "listener '{listener}': invalid dispatch mode '{value}' (expected sync, async-isolated or async-shared)"
    )]
    InvalidMode { listener: String, value: String },

    #[error("listener '{listener}': queue capacity must be a positive integer, got '{value}'")]
    InvalidQueueCapacity { listener: String, value: String },

    #[error("default queue capacity must be positive")]
    ZeroDefaultQueueCapacity,

    #[error("listener '{listener}': invalid property '{key}': {reason}")]
    InvalidProperty {
        listener: String,
        key: String,
        reason: String,
    },

    #[error("listener '{listener}' failed to start: {reason}")]
    StartFailed { listener: String, reason: String },

    #[error("could not spawn worker for queue '{queue}': {reason}")]
    SpawnFailed { queue: String, reason: String },
}

//! Listener plugin interface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ListenerError;
use crate::event::{Event, EventPhase};

/// Receives catalog operation events.
///
/// Callbacks run on the emitting thread (`sync` mode) or on a queue worker
/// thread (async modes), so they must not block for long. Returned errors and
/// panics are caught by the bus, logged and counted; they never reach the
/// operation.
///
/// # Examples
///
/// ```
/// use keystone_eventbus::{Event, EventListener, ListenerError};
///
/// struct Denylist;
///
/// impl EventListener for Denylist {
///     fn name(&self) -> &str {
///         "denylist"
///     }
///
///     fn on_pre_event(&self, event: &Event) -> Result<(), ListenerError> {
///         if event.user() == "mallory" {
///             return Err(ListenerError::failed("denylisted user seen"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait EventListener: Send + Sync + 'static {
    /// Unique name within a bus
    fn name(&self) -> &str;

    /// Called once when the bus is built, before any event.
    fn start(&self) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Called once at shutdown, after the listener's queue has drained.
    fn stop(&self) {}

    fn on_pre_event(&self, _event: &Event) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_success_event(&self, _event: &Event) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_failure_event(&self, _event: &Event) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Entry point used by the bus; routes on the event's phase.
    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        match event.phase() {
            EventPhase::Pre => self.on_pre_event(event),
            EventPhase::PostSuccess => self.on_success_event(event),
            EventPhase::PostFailure => self.on_failure_event(event),
        }
    }
}

/// How the bus hands events to a listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// Invoked on the emitting thread, in registration order
    #[default]
    Sync,
    /// Own bounded queue drained by its own worker thread
    AsyncIsolated,
    /// One bounded queue and worker shared by every listener in this mode
    AsyncShared,
}

impl DispatchMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::AsyncIsolated => "async-isolated",
            Self::AsyncShared => "async-shared",
        }
    }

    pub const fn is_async(self) -> bool {
        !matches!(self, Self::Sync)
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async-isolated" | "async_isolated" => Ok(Self::AsyncIsolated),
            "async-shared" | "async_shared" => Ok(Self::AsyncShared),
            _ => Err(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use keystone_core::NameIdentifier;
    use rstest::rstest;

    use super::*;
    use crate::event::FailureInfo;
    use crate::operation::OperationType;

    #[derive(Default)]
    struct PhaseRecorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl EventListener for PhaseRecorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_pre_event(&self, _event: &Event) -> Result<(), ListenerError> {
            self.seen.lock().unwrap().push("pre");
            Ok(())
        }

        fn on_success_event(&self, _event: &Event) -> Result<(), ListenerError> {
            self.seen.lock().unwrap().push("success");
            Ok(())
        }

        fn on_failure_event(&self, _event: &Event) -> Result<(), ListenerError> {
            self.seen.lock().unwrap().push("failure");
            Ok(())
        }
    }

    #[test]
    fn on_event_routes_by_phase() {
        let ident = NameIdentifier::of(["acme", "hive"]).unwrap();
        let pre = Event::pre("alice", ident, OperationType::LoadCatalog).unwrap();
        let recorder = PhaseRecorder::default();

        recorder.on_event(&pre).unwrap();
        recorder.on_event(&pre.succeeded(None)).unwrap();
        recorder.on_event(&pre.failed(FailureInfo::abandoned())).unwrap();

        assert_eq!(*recorder.seen.lock().unwrap(), ["pre", "success", "failure"]);
    }

    #[rstest]
    #[case("sync", DispatchMode::Sync)]
    #[case("async-isolated", DispatchMode::AsyncIsolated)]
    #[case("ASYNC_SHARED", DispatchMode::AsyncShared)]
    fn parses_modes(#[case] input: &str, #[case] expected: DispatchMode) {
        assert_eq!(input.parse::<DispatchMode>().unwrap(), expected);
    }

    #[test]
    fn unknown_mode_is_returned_verbatim() {
        assert_eq!("eventually".parse::<DispatchMode>().unwrap_err(), "eventually");
    }
}

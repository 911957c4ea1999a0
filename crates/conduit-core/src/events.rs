use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionId, Timestamp};

/// The kinds of lifecycle notification the dispatch engine emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A definition was added to the registry.
    ActionRegistered,
    /// An execution was admitted and is about to run.
    Started,
    /// An execution returned a result.
    Completed,
    /// An execution failed after admission (error or timeout).
    Failed,
    /// A monitor flagged a successful result.
    MonitorWarning,
}

impl EventKind {
    /// Returns a stable event name for logging and serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ActionRegistered => "action_registered",
            EventKind::Started => "started",
            EventKind::Completed => "completed",
            EventKind::Failed => "failed",
            EventKind::MonitorWarning => "monitor_warning",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fire-and-forget notification about an action or one of its executions.
///
/// `execution_id` is `None` only for [`EventKind::ActionRegistered`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub execution_id: Option<ExecutionId>,
    pub action_name: String,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl LifecycleEvent {
    /// Event for a freshly registered action.
    pub fn registered(action_name: &str, payload: serde_json::Value) -> Self {
        Self {
            kind: EventKind::ActionRegistered,
            execution_id: None,
            action_name: action_name.to_string(),
            payload,
            timestamp: Timestamp::now(),
        }
    }

    /// Event tied to a single execution.
    pub fn execution(
        kind: EventKind,
        execution_id: ExecutionId,
        action_name: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            execution_id: Some(execution_id),
            action_name: action_name.to_string(),
            payload,
            timestamp: Timestamp::now(),
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        self.kind.as_str()
    }
}

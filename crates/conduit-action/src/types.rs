//! Core types and value objects for the action engine.

use conduit_core::types::{ExecutionId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Contexts
// =============================================================================

/// Who is asking for an action, as seen by `validate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerContext {
    /// The agent the action is performed for, if any.
    pub agent_id: Option<String>,
    /// Conversation or session the call belongs to.
    pub session_id: Option<Uuid>,
    /// Free-form caller data passed through to the action.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CallerContext {
    /// Context for a call made on behalf of `agent_id`.
    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// The caller context extended with per-execution bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub caller: CallerContext,
    pub execution_id: ExecutionId,
    pub action_name: String,
    pub started_at: Timestamp,
}

impl ExecutionContext {
    pub fn agent_id(&self) -> Option<&str> {
        self.caller.agent_id.as_deref()
    }
}

// =============================================================================
// Capability results
// =============================================================================

/// Outcome of an action's `validate` capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(String),
}

impl Validation {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Validation::Invalid(reason.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// Outcome of an advisory monitor check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorVerdict {
    Ok,
    Warning(String),
}

// =============================================================================
// Execution bookkeeping
// =============================================================================

/// Bookkeeping entry for one in-flight execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: ExecutionId,
    pub action_name: String,
    pub params: serde_json::Value,
    pub started_at: Timestamp,
}

/// Phases an execution passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Validating,
    Rejected,
    Admitted,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl ExecutionState {
    /// Terminal states always release the concurrency slot.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Rejected
                | ExecutionState::Completed
                | ExecutionState::Failed
                | ExecutionState::TimedOut
        )
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Validating => write!(f, "validating"),
            ExecutionState::Rejected => write!(f, "rejected"),
            ExecutionState::Admitted => write!(f, "admitted"),
            ExecutionState::Running => write!(f, "running"),
            ExecutionState::Completed => write!(f, "completed"),
            ExecutionState::Failed => write!(f, "failed"),
            ExecutionState::TimedOut => write!(f, "timed_out"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

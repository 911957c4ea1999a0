//! Error types for the action engine.

/// Errors raised by an action's own logic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("Action failed: {0}")]
    Failed(String),
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error("Dependency unavailable: {0}")]
    UnavailableDependency(String),
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

/// Errors surfaced to callers of the engine.
///
/// `ActionNotFound`, `Validation` and `ConcurrencyLimit` are raised before
/// admission and never create an execution record. `Timeout`, `Execution`
/// and `UnavailableDependency` are raised after admission, once the record
/// has already been released.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("Action engine is not initialized")]
    NotInitialized,
    #[error("Action engine is already initialized")]
    AlreadyInitialized,
    #[error("Action already registered: {0}")]
    DuplicateAction(String),
    #[error("Invalid action definition: {0}")]
    InvalidDefinition(String),
    #[error("Action not found: {0}")]
    ActionNotFound(String),
    #[error("Validation failed for {action}: {reason}")]
    Validation { action: String, reason: String },
    #[error("Concurrency limit reached ({limit} executions in flight)")]
    ConcurrencyLimit { limit: usize },
    #[error("Action {action} timed out after {timeout_ms} ms")]
    Timeout { action: String, timeout_ms: u64 },
    #[error("Action {action} failed: {source}")]
    Execution {
        action: String,
        #[source]
        source: ActionError,
    },
    #[error("Dependency unavailable: {0}")]
    UnavailableDependency(String),
}

impl DispatchError {
    /// Whether this error was raised before an execution record existed.
    pub fn is_pre_admission(&self) -> bool {
        matches!(
            self,
            DispatchError::NotInitialized
                | DispatchError::ActionNotFound(_)
                | DispatchError::Validation { .. }
                | DispatchError::ConcurrencyLimit { .. }
        )
    }

    /// Map a handler failure to the error reported for `action`.
    pub(crate) fn from_action(action: &str, err: ActionError) -> Self {
        match err {
            ActionError::UnavailableDependency(dep) => DispatchError::UnavailableDependency(dep),
            other => DispatchError::Execution {
                action: action.to_string(),
                source: other,
            },
        }
    }
}

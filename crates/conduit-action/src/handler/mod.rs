//! Action capabilities and definitions.
//!
//! An action is a named [`ActionDefinition`] bundling a mandatory
//! [`ActionHandler`] (validate + execute) with an optional advisory
//! [`ActionMonitor`] and an optional best-effort [`ActionCancel`] hook.
//! The built-in catalog lives in the submodules and is assembled by
//! [`builtin_definitions`].

pub mod echo;
pub mod inventory;
pub mod memory;
pub mod persona;
pub mod scenario;
pub mod spatial;
pub mod time;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_core::types::ExecutionId;
use serde_json::Value;

use crate::collaborators::Collaborators;
use crate::error::ActionError;
use crate::types::{CallerContext, ExecutionContext, MonitorVerdict, Validation};

// =============================================================================
// Capabilities
// =============================================================================

/// The two mandatory capabilities of every action.
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    /// Check `params` before admission. Must not have side effects.
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation;

    /// Perform the action. Runs on its own task and may be aborted on timeout.
    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError>;
}

/// Advisory post-check run on a successful result.
#[async_trait]
pub trait ActionMonitor: Send + Sync + 'static {
    async fn check(
        &self,
        result: &Value,
        params: &Value,
        ctx: &ExecutionContext,
    ) -> Result<MonitorVerdict, ActionError>;
}

/// Best-effort cancellation hook invoked when an execution times out or the
/// engine shuts down.
pub trait ActionCancel: Send + Sync + 'static {
    fn cancel(&self, execution_id: ExecutionId, ctx: &ExecutionContext);
}

// =============================================================================
// Definition
// =============================================================================

/// Immutable description of a registered action.
#[derive(Clone)]
pub struct ActionDefinition {
    pub name: String,
    pub description: String,
    pub category: String,
    /// Documentation only; enforcement is up to `validate`.
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
    pub handler: Arc<dyn ActionHandler>,
    pub monitor: Option<Arc<dyn ActionMonitor>>,
    pub canceller: Option<Arc<dyn ActionCancel>>,
    /// Falls back to the engine default when `None`.
    pub timeout: Option<Duration>,
}

impl ActionDefinition {
    pub fn new(name: impl Into<String>, handler: impl ActionHandler) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: "general".to_string(),
            required_params: Vec::new(),
            optional_params: Vec::new(),
            handler: Arc::new(handler),
            monitor: None,
            canceller: None,
            timeout: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_required(mut self, params: &[&str]) -> Self {
        self.required_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_optional(mut self, params: &[&str]) -> Self {
        self.optional_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_monitor(mut self, monitor: impl ActionMonitor) -> Self {
        self.monitor = Some(Arc::new(monitor));
        self
    }

    pub fn with_canceller(mut self, canceller: impl ActionCancel) -> Self {
        self.canceller = Some(Arc::new(canceller));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("required_params", &self.required_params)
            .field("optional_params", &self.optional_params)
            .field("has_monitor", &self.monitor.is_some())
            .field("has_canceller", &self.canceller.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// =============================================================================
// Built-in catalog
// =============================================================================

/// Every built-in action, wired to `collaborators`.
pub fn builtin_definitions(collaborators: &Collaborators) -> Vec<ActionDefinition> {
    vec![
        echo::definition(),
        memory::remember_definition(collaborators),
        memory::recall_definition(collaborators),
        spatial::move_to_definition(collaborators),
        spatial::look_around_definition(collaborators),
        inventory::check_inventory_definition(collaborators),
        inventory::give_item_definition(collaborators),
        time::check_time_definition(collaborators),
        time::wait_definition(collaborators),
        persona::describe_agent_definition(collaborators),
        scenario::scenario_status_definition(collaborators),
        scenario::set_scenario_flag_definition(collaborators),
    ]
}

// =============================================================================
// Parameter helpers
// =============================================================================

/// Non-blank string parameter.
pub(crate) fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, ActionError> {
    str_param(params, key)
        .ok_or_else(|| ActionError::InvalidParams(format!("{} is required", key)))
}

/// Validation shared by the built-ins: params must be an object, each key in
/// `required` must be a non-blank string and, when `needs_agent` is set,
/// the caller must name an agent.
pub(crate) fn check_params(
    params: &Value,
    caller: &CallerContext,
    required: &[&str],
    needs_agent: bool,
) -> Validation {
    if !params.is_object() {
        return Validation::invalid("params must be a JSON object");
    }
    if let Some(missing) = required.iter().find(|key| str_param(params, key).is_none()) {
        return Validation::invalid(format!("{} is required", missing));
    }
    if needs_agent && caller.agent_id.as_deref().map_or(true, str::is_empty) {
        return Validation::invalid("an acting agent is required");
    }
    Validation::Valid
}

pub(crate) fn acting_agent(ctx: &ExecutionContext) -> Result<&str, ActionError> {
    ctx.agent_id()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ActionError::InvalidParams("an acting agent is required".to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use conduit_core::types::{ExecutionId, Timestamp};

    use crate::types::{CallerContext, ExecutionContext};

    pub fn ctx_for(agent: Option<&str>, action: &str) -> ExecutionContext {
        ExecutionContext {
            caller: CallerContext {
                agent_id: agent.map(str::to_string),
                ..CallerContext::default()
            },
            execution_id: ExecutionId::new(),
            action_name: action.to_string(),
            started_at: Timestamp::now(),
        }
    }
}

//! Persona action handler: `describe_agent`.

use async_trait::async_trait;
use serde_json::Value;

use crate::collaborators::Collaborators;
use crate::error::ActionError;
use crate::handler::{check_params, required_str, ActionDefinition, ActionHandler};
use crate::types::{CallerContext, ExecutionContext, Validation};

pub struct DescribeAgentHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for DescribeAgentHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        check_params(params, caller, &["agent"], false)
    }

    async fn execute(&self, params: Value, _ctx: ExecutionContext) -> Result<Value, ActionError> {
        let directory = self.deps.directory()?;
        let agent = required_str(&params, "agent")?;
        let profile = directory
            .lookup(agent)
            .await?
            .ok_or_else(|| ActionError::Failed(format!("unknown agent: {}", agent)))?;
        serde_json::to_value(profile).map_err(|e| ActionError::Collaborator(e.to_string()))
    }
}

pub fn describe_agent_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("describe_agent", DescribeAgentHandler { deps: deps.clone() })
        .with_description("Look up another agent's public profile")
        .with_category("persona")
        .with_required(&["agent"])
}

//! Scenario action handlers: `scenario_status` and `set_scenario_flag`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborators::Collaborators;
use crate::error::ActionError;
use crate::handler::{check_params, required_str, ActionDefinition, ActionHandler};
use crate::types::{CallerContext, ExecutionContext, Validation};

pub struct ScenarioStatusHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for ScenarioStatusHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        check_params(params, caller, &[], false)
    }

    async fn execute(&self, _params: Value, _ctx: ExecutionContext) -> Result<Value, ActionError> {
        self.deps.scenario()?.snapshot().await
    }
}

pub struct SetScenarioFlagHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for SetScenarioFlagHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        let base = check_params(params, caller, &["flag"], false);
        if !base.is_valid() {
            return base;
        }
        match params.get("value") {
            None | Some(Value::Null) => Validation::invalid("value is required"),
            Some(_) => Validation::Valid,
        }
    }

    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let scenario = self.deps.scenario()?;
        let flag = required_str(&params, "flag")?;
        let value = params
            .get("value")
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| ActionError::InvalidParams("value is required".to_string()))?;

        scenario.set_flag(flag, value.clone()).await?;
        tracing::info!(flag = %flag, agent = ?ctx.agent_id(), "Scenario flag set");
        Ok(json!({ "flag": flag, "value": value }))
    }
}

pub fn scenario_status_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("scenario_status", ScenarioStatusHandler { deps: deps.clone() })
        .with_description("Report the current scenario state")
        .with_category("scenario")
}

pub fn set_scenario_flag_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("set_scenario_flag", SetScenarioFlagHandler { deps: deps.clone() })
        .with_description("Set a scenario flag to a JSON value")
        .with_category("scenario")
        .with_required(&["flag", "value"])
}

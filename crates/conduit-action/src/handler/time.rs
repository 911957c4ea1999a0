//! Time action handlers: `check_time` and `wait`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborators::{Collaborators, WorldTime};
use crate::error::ActionError;
use crate::handler::{check_params, ActionDefinition, ActionHandler};
use crate::types::{CallerContext, ExecutionContext, Validation};

/// Longest single wait, one in-world day.
const MAX_WAIT_MINUTES: u64 = 24 * 60;

fn describe(time: WorldTime) -> Value {
    json!({
        "day": time.day,
        "hour": time.hour,
        "minute": time.minute,
        "period": time.period(),
        "display": time.to_string(),
    })
}

pub struct CheckTimeHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for CheckTimeHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        check_params(params, caller, &[], false)
    }

    async fn execute(&self, _params: Value, _ctx: ExecutionContext) -> Result<Value, ActionError> {
        let now = self.deps.clock()?.now().await?;
        Ok(describe(now))
    }
}

/// Lets in-world time pass.
pub struct WaitHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for WaitHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        let base = check_params(params, caller, &[], true);
        if !base.is_valid() {
            return base;
        }
        match params.get("minutes").and_then(Value::as_u64) {
            Some(m) if (1..=MAX_WAIT_MINUTES).contains(&m) => Validation::Valid,
            _ => Validation::invalid(format!(
                "minutes must be an integer between 1 and {}",
                MAX_WAIT_MINUTES
            )),
        }
    }

    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let clock = self.deps.clock()?;
        let minutes = params
            .get("minutes")
            .and_then(Value::as_u64)
            .filter(|m| (1..=MAX_WAIT_MINUTES).contains(m))
            .ok_or_else(|| ActionError::InvalidParams("minutes is required".to_string()))?;

        let now = clock.advance(minutes as u32).await?;
        tracing::debug!(agent = ?ctx.agent_id(), minutes, time = %now, "Waited");
        Ok(describe(now))
    }
}

pub fn check_time_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("check_time", CheckTimeHandler { deps: deps.clone() })
        .with_description("Report the current in-world time")
        .with_category("time")
}

pub fn wait_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("wait", WaitHandler { deps: deps.clone() })
        .with_description("Let the given number of in-world minutes pass")
        .with_category("time")
        .with_required(&["minutes"])
}

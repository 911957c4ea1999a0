//! Echo action handler.
//!
//! Returns its input unchanged, whitespace included. Useful for checking the
//! protocol end to end.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ActionError;
use crate::handler::{check_params, ActionDefinition, ActionHandler};
use crate::types::{CallerContext, ExecutionContext, Validation};

pub struct EchoHandler;

#[async_trait]
impl ActionHandler for EchoHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        check_params(params, caller, &["text"], false)
    }

    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let text = params
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidParams("text is required".to_string()))?;
        tracing::debug!(execution_id = %ctx.execution_id, "Echo");
        Ok(json!({ "success": true, "text": text }))
    }
}

pub fn definition() -> ActionDefinition {
    ActionDefinition::new("echo", EchoHandler)
        .with_description("Repeat the given text back")
        .with_category("utility")
        .with_required(&["text"])
}

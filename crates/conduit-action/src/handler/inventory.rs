//! Inventory action handlers: `check_inventory` and `give_item`.
//!
//! `give_item` carries a monitor that flags a giver who just handed over
//! their last unit of an item.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborators::Collaborators;
use crate::error::ActionError;
use crate::handler::{
    acting_agent, check_params, required_str, str_param, ActionDefinition, ActionHandler,
    ActionMonitor,
};
use crate::types::{CallerContext, ExecutionContext, MonitorVerdict, Validation};

pub struct CheckInventoryHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for CheckInventoryHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        check_params(params, caller, &[], true)
    }

    async fn execute(&self, _params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let store = self.deps.inventory()?;
        let agent = acting_agent(&ctx)?;
        let items = store.items(agent).await?;
        Ok(json!({ "items": items }))
    }
}

pub struct GiveItemHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for GiveItemHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        let base = check_params(params, caller, &["recipient", "item"], true);
        if !base.is_valid() {
            return base;
        }
        if str_param(params, "recipient") == caller.agent_id.as_deref() {
            return Validation::invalid("cannot give an item to yourself");
        }
        match params.get("quantity") {
            None | Some(Value::Null) => Validation::Valid,
            Some(v) => match v.as_u64() {
                Some(n) if n >= 1 && n <= u64::from(u32::MAX) => Validation::Valid,
                _ => Validation::invalid("quantity must be a positive integer"),
            },
        }
    }

    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let store = self.deps.inventory()?;
        let agent = acting_agent(&ctx)?;
        let recipient = required_str(&params, "recipient")?;
        let item = required_str(&params, "item")?;
        let quantity = params
            .get("quantity")
            .and_then(Value::as_u64)
            .map_or(Ok(1), u32::try_from)
            .map_err(|_| ActionError::InvalidParams("quantity out of range".to_string()))?;

        let remaining = store.transfer(agent, recipient, item, quantity).await?;
        tracing::info!(
            from = %agent,
            to = %recipient,
            item = %item,
            quantity,
            "Item transferred"
        );

        Ok(json!({
            "item": item,
            "given": quantity,
            "recipient": recipient,
            "remaining": remaining,
        }))
    }
}

/// Warns when a transfer left the giver with none of the item.
pub struct LastItemMonitor;

#[async_trait]
impl ActionMonitor for LastItemMonitor {
    async fn check(
        &self,
        result: &Value,
        _params: &Value,
        ctx: &ExecutionContext,
    ) -> Result<MonitorVerdict, ActionError> {
        let remaining = result
            .get("remaining")
            .and_then(Value::as_u64)
            .ok_or_else(|| ActionError::Failed("result has no remaining count".to_string()))?;
        if remaining > 0 {
            return Ok(MonitorVerdict::Ok);
        }
        let item = result.get("item").and_then(Value::as_str).unwrap_or("item");
        let giver = ctx.agent_id().unwrap_or("agent");
        Ok(MonitorVerdict::Warning(format!(
            "{} has no {} left",
            giver, item
        )))
    }
}

pub fn check_inventory_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("check_inventory", CheckInventoryHandler { deps: deps.clone() })
        .with_description("List the items the acting agent carries")
        .with_category("inventory")
}

pub fn give_item_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("give_item", GiveItemHandler { deps: deps.clone() })
        .with_description("Give items from the acting agent to another agent")
        .with_category("inventory")
        .with_required(&["recipient", "item"])
        .with_optional(&["quantity"])
        .with_monitor(LastItemMonitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::in_memory::InMemoryInventory;
    use crate::handler::test_support::ctx_for;
    use std::sync::Arc;

    fn stocked() -> (Arc<InMemoryInventory>, Collaborators) {
        let inv = Arc::new(InMemoryInventory::new());
        inv.add("ada", "apple", 2);
        let deps = Collaborators::none().with_inventory(inv.clone());
        (inv, deps)
    }

    #[tokio::test]
    async fn test_give_item_default_quantity() {
        let (inv, deps) = stocked();
        let handler = GiveItemHandler { deps };
        let result = handler
            .execute(
                json!({"recipient": "bo", "item": "apple"}),
                ctx_for(Some("ada"), "give_item"),
            )
            .await
            .unwrap();
        assert_eq!(result["given"], 1);
        assert_eq!(result["remaining"], 1);
        assert_eq!(inv.count("bo", "apple"), 1);
    }

    #[tokio::test]
    async fn test_give_item_validation() {
        let (_, deps) = stocked();
        let handler = GiveItemHandler { deps };
        let ada = CallerContext::for_agent("ada");

        let v = handler
            .validate(&json!({"recipient": "ada", "item": "apple"}), &ada)
            .await;
        assert_eq!(v, Validation::invalid("cannot give an item to yourself"));

        let v = handler
            .validate(&json!({"recipient": "bo", "item": "apple", "quantity": 0}), &ada)
            .await;
        assert!(!v.is_valid());

        let v = handler
            .validate(&json!({"recipient": "bo", "item": "apple", "quantity": 2}), &ada)
            .await;
        assert!(v.is_valid());
    }

    #[tokio::test]
    async fn test_check_inventory_lists_items() {
        let (_, deps) = stocked();
        let handler = CheckInventoryHandler { deps };
        let result = handler
            .execute(json!({}), ctx_for(Some("ada"), "check_inventory"))
            .await
            .unwrap();
        assert_eq!(result["items"][0]["item"], "apple");
        assert_eq!(result["items"][0]["quantity"], 2);
    }

    // ---- monitor ----

    #[tokio::test]
    async fn test_monitor_warns_on_last_item() {
        let ctx = ctx_for(Some("ada"), "give_item");
        let verdict = LastItemMonitor
            .check(&json!({"item": "apple", "remaining": 0}), &json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(verdict, MonitorVerdict::Warning("ada has no apple left".into()));

        let verdict = LastItemMonitor
            .check(&json!({"item": "apple", "remaining": 3}), &json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(verdict, MonitorVerdict::Ok);
    }

    #[tokio::test]
    async fn test_monitor_errors_on_unexpected_result() {
        let ctx = ctx_for(Some("ada"), "give_item");
        assert!(LastItemMonitor.check(&json!({}), &json!({}), &ctx).await.is_err());
    }
}

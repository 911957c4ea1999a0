//! Spatial action handlers: `move_to` and `look_around`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborators::Collaborators;
use crate::error::ActionError;
use crate::handler::{acting_agent, check_params, required_str, ActionDefinition, ActionHandler};
use crate::types::{CallerContext, ExecutionContext, Validation};

pub struct MoveToHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for MoveToHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        check_params(params, caller, &["destination"], true)
    }

    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let graph = self.deps.spatial()?;
        let agent = acting_agent(&ctx)?;
        let destination = required_str(&params, "destination")?;

        let from = graph.location_of(agent).await?;
        let arrived = graph.move_agent(agent, destination).await?;
        tracing::info!(agent = %agent, location = %arrived, "Agent moved");

        Ok(json!({
            "from": from,
            "location": arrived,
        }))
    }
}

/// Reports the acting agent's surroundings.
pub struct LookAroundHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for LookAroundHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        check_params(params, caller, &[], true)
    }

    async fn execute(&self, _params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let graph = self.deps.spatial()?;
        let agent = acting_agent(&ctx)?;

        let location = graph
            .location_of(agent)
            .await?
            .ok_or_else(|| ActionError::Failed(format!("{} has no location", agent)))?;
        let exits = graph.neighbors(&location).await?;
        let present: Vec<String> = graph
            .occupants(&location)
            .await?
            .into_iter()
            .filter(|other| other != agent)
            .collect();

        Ok(json!({
            "location": location,
            "exits": exits,
            "present": present,
        }))
    }
}

pub fn move_to_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("move_to", MoveToHandler { deps: deps.clone() })
        .with_description("Move the acting agent to an adjacent location")
        .with_category("spatial")
        .with_required(&["destination"])
}

pub fn look_around_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("look_around", LookAroundHandler { deps: deps.clone() })
        .with_description("Describe the acting agent's location, exits and company")
        .with_category("spatial")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::in_memory::InMemorySpatialGraph;
    use crate::handler::test_support::ctx_for;
    use std::sync::Arc;

    fn village() -> Collaborators {
        let graph = InMemorySpatialGraph::new();
        graph.connect("square", "tavern");
        graph.connect("square", "mill");
        graph.place("ada", "square");
        graph.place("bo", "square");
        Collaborators::none().with_spatial(Arc::new(graph))
    }

    #[tokio::test]
    async fn test_move_to_adjacent() {
        let handler = MoveToHandler { deps: village() };
        let result = handler
            .execute(json!({"destination": "tavern"}), ctx_for(Some("ada"), "move_to"))
            .await
            .unwrap();
        assert_eq!(result["from"], "square");
        assert_eq!(result["location"], "tavern");
    }

    #[tokio::test]
    async fn test_move_to_unreachable_fails() {
        let handler = MoveToHandler { deps: village() };
        let err = handler
            .execute(json!({"destination": "castle"}), ctx_for(Some("ada"), "move_to"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Failed(_)));
    }

    #[tokio::test]
    async fn test_look_around_excludes_self() {
        let handler = LookAroundHandler { deps: village() };
        let result = handler
            .execute(json!({}), ctx_for(Some("ada"), "look_around"))
            .await
            .unwrap();
        assert_eq!(result["location"], "square");
        assert_eq!(result["present"], json!(["bo"]));
        assert_eq!(result["exits"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_look_around_requires_agent() {
        let handler = LookAroundHandler { deps: village() };
        let v = handler.validate(&json!({}), &CallerContext::default()).await;
        assert!(!v.is_valid());
    }
}

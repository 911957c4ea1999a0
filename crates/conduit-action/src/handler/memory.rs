//! Memory action handlers: `remember` and `recall`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborators::Collaborators;
use crate::error::ActionError;
use crate::handler::{acting_agent, check_params, required_str, ActionDefinition, ActionHandler};
use crate::types::{CallerContext, ExecutionContext, Validation};

const DEFAULT_IMPORTANCE: f64 = 0.5;
const DEFAULT_RECALL_LIMIT: u64 = 5;
const MAX_RECALL_LIMIT: u64 = 50;

/// Stores a memory for the acting agent.
pub struct RememberHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for RememberHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        let base = check_params(params, caller, &["content"], true);
        if !base.is_valid() {
            return base;
        }
        match params.get("importance") {
            None | Some(Value::Null) => Validation::Valid,
            Some(v) => match v.as_f64() {
                Some(i) if (0.0..=1.0).contains(&i) => Validation::Valid,
                _ => Validation::invalid("importance must be a number between 0 and 1"),
            },
        }
    }

    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let store = self.deps.memory()?;
        let agent = acting_agent(&ctx)?;
        let content = required_str(&params, "content")?;
        let importance = params
            .get("importance")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_IMPORTANCE) as f32;

        let entry = store.store(agent, content, importance).await?;
        tracing::info!(agent = %agent, memory_id = %entry.id, "Memory stored");

        Ok(json!({
            "memory_id": entry.id,
            "importance": entry.importance,
        }))
    }
}

/// Searches the acting agent's memories.
pub struct RecallHandler {
    deps: Collaborators,
}

#[async_trait]
impl ActionHandler for RecallHandler {
    async fn validate(&self, params: &Value, caller: &CallerContext) -> Validation {
        let base = check_params(params, caller, &["query"], true);
        if !base.is_valid() {
            return base;
        }
        match params.get("limit") {
            None | Some(Value::Null) => Validation::Valid,
            Some(v) => match v.as_u64() {
                Some(n) if (1..=MAX_RECALL_LIMIT).contains(&n) => Validation::Valid,
                _ => Validation::invalid(format!(
                    "limit must be an integer between 1 and {}",
                    MAX_RECALL_LIMIT
                )),
            },
        }
    }

    async fn execute(&self, params: Value, ctx: ExecutionContext) -> Result<Value, ActionError> {
        let store = self.deps.memory()?;
        let agent = acting_agent(&ctx)?;
        let query = required_str(&params, "query")?;
        let limit = params
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_RECALL_LIMIT)
            .min(MAX_RECALL_LIMIT) as usize;

        let hits = store.search(agent, query, limit).await?;
        let memories: Vec<Value> = hits
            .iter()
            .map(|m| {
                json!({
                    "content": m.content,
                    "importance": m.importance,
                    "created_at": m.created_at.to_string(),
                })
            })
            .collect();

        Ok(json!({
            "count": memories.len(),
            "memories": memories,
        }))
    }
}

pub fn remember_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("remember", RememberHandler { deps: deps.clone() })
        .with_description("Store a memory for the acting agent")
        .with_category("memory")
        .with_required(&["content"])
        .with_optional(&["importance"])
}

pub fn recall_definition(deps: &Collaborators) -> ActionDefinition {
    ActionDefinition::new("recall", RecallHandler { deps: deps.clone() })
        .with_description("Search the acting agent's memories")
        .with_category("memory")
        .with_required(&["query"])
        .with_optional(&["limit"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::in_memory::InMemoryMemoryStore;
    use crate::handler::test_support::ctx_for;
    use std::sync::Arc;

    fn deps() -> Collaborators {
        Collaborators::none().with_memory(Arc::new(InMemoryMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_remember_then_recall() {
        let deps = deps();
        let remember = RememberHandler { deps: deps.clone() };
        let recall = RecallHandler { deps };

        remember
            .execute(
                json!({"content": "The miller owes me two coins", "importance": 0.8}),
                ctx_for(Some("ada"), "remember"),
            )
            .await
            .unwrap();

        let result = recall
            .execute(json!({"query": "miller coins"}), ctx_for(Some("ada"), "recall"))
            .await
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["memories"][0]["content"], "The miller owes me two coins");

        let other = recall
            .execute(json!({"query": "miller"}), ctx_for(Some("bo"), "recall"))
            .await
            .unwrap();
        assert_eq!(other["count"], 0);
    }

    #[tokio::test]
    async fn test_remember_validation() {
        let handler = RememberHandler { deps: deps() };
        let ada = CallerContext::for_agent("ada");

        assert!(handler.validate(&json!({"content": "x"}), &ada).await.is_valid());
        assert!(!handler
            .validate(&json!({"content": "x", "importance": 2}), &ada)
            .await
            .is_valid());
        assert!(!handler
            .validate(&json!({"content": "x"}), &CallerContext::default())
            .await
            .is_valid());
    }

    #[tokio::test]
    async fn test_recall_limit_bounds() {
        let handler = RecallHandler { deps: deps() };
        let ada = CallerContext::for_agent("ada");
        assert!(handler.validate(&json!({"query": "x", "limit": 3}), &ada).await.is_valid());
        assert!(!handler.validate(&json!({"query": "x", "limit": 0}), &ada).await.is_valid());
        assert!(!handler.validate(&json!({"query": "x", "limit": 500}), &ada).await.is_valid());
    }

    #[tokio::test]
    async fn test_missing_store_is_unavailable() {
        let handler = RememberHandler {
            deps: Collaborators::none(),
        };
        let err = handler
            .execute(json!({"content": "x"}), ctx_for(Some("ada"), "remember"))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::UnavailableDependency("memory store".into()));
    }
}

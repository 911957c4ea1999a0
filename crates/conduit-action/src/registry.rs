//! Action registry.
//!
//! Holds immutable [`ActionDefinition`]s keyed by name, in registration
//! order. Definitions are never replaced; the registry is only emptied as a
//! whole at engine teardown.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use std::time::Duration;

use conduit_core::types::Timestamp;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::DispatchError;
use crate::handler::ActionDefinition;

/// Names must be addressable by the command protocol.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

pub fn is_valid_action_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// A definition as stored by the registry.
#[derive(Debug)]
pub struct RegisteredAction {
    pub definition: ActionDefinition,
    /// Effective timeout: the definition's own, or the registry default.
    pub timeout: Duration,
    pub created_at: Timestamp,
}

impl RegisteredAction {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// JSON description used by `action-describe` and the CLI listing.
    pub fn describe(&self) -> Value {
        let def = &self.definition;
        json!({
            "name": def.name,
            "description": def.description,
            "category": def.category,
            "required_params": def.required_params,
            "optional_params": def.optional_params,
            "timeout_ms": self.timeout.as_millis() as u64,
            "monitored": def.monitor.is_some(),
            "registered_at": self.created_at.to_string(),
        })
    }
}

#[derive(Default)]
struct Entries {
    ordered: Vec<Arc<RegisteredAction>>,
    by_name: HashMap<String, usize>,
}

pub struct ActionRegistry {
    entries: RwLock<Entries>,
    default_timeout: Duration,
}

impl ActionRegistry {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Add a definition under `name`.
    ///
    /// Fails with `DuplicateAction` if the name is taken, leaving the
    /// existing definition untouched.
    pub fn register(
        &self,
        name: &str,
        definition: ActionDefinition,
    ) -> Result<Arc<RegisteredAction>, DispatchError> {
        if !is_valid_action_name(name) {
            return Err(DispatchError::InvalidDefinition(format!(
                "action name {:?} must match [A-Za-z0-9_-]+",
                name
            )));
        }
        if definition.name != name {
            return Err(DispatchError::InvalidDefinition(format!(
                "registered as {:?} but definition is named {:?}",
                name, definition.name
            )));
        }
        if definition.timeout == Some(Duration::ZERO) {
            return Err(DispatchError::InvalidDefinition(format!(
                "action {} has a zero timeout",
                name
            )));
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.by_name.contains_key(name) {
            return Err(DispatchError::DuplicateAction(name.to_string()));
        }

        let action = Arc::new(RegisteredAction {
            timeout: definition.timeout.unwrap_or(self.default_timeout),
            definition,
            created_at: Timestamp::now(),
        });
        let index = entries.ordered.len();
        entries.ordered.push(Arc::clone(&action));
        entries.by_name.insert(name.to_string(), index);
        Ok(action)
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredAction>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .by_name
            .get(name)
            .map(|&i| Arc::clone(&entries.ordered[i]))
    }

    /// All actions in registration order, optionally limited to `category`.
    pub fn list(&self, category: Option<&str>) -> Vec<Arc<RegisteredAction>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .ordered
            .iter()
            .filter(|a| category.map_or(true, |c| a.definition.category == c))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every definition. Only used at teardown.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.ordered.clear();
        entries.by_name.clear();
    }
}

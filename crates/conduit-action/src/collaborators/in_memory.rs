//! In-memory collaborator implementations.
//!
//! Used by tests and by the demo binary. State lives behind `std::sync`
//! locks that are never held across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use conduit_core::types::Timestamp;
use uuid::Uuid;

use super::{
    AgentDirectory, AgentProfile, InventoryStore, ItemStack, MemoryEntry, MemoryStore,
    ScenarioState, SpatialGraph, WorldClock, WorldTime,
};
use crate::error::ActionError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Memory
// =============================================================================

/// Memory store with keyword-overlap search.
#[derive(Default)]
pub struct InMemoryMemoryStore {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn store(
        &self,
        agent_id: &str,
        content: &str,
        importance: f32,
    ) -> Result<MemoryEntry, ActionError> {
        let entry = MemoryEntry {
            id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            content: content.to_string(),
            importance: importance.clamp(0.0, 1.0),
            created_at: Timestamp::now(),
        };
        lock(&self.entries).push(entry.clone());
        Ok(entry)
    }

    async fn search(
        &self,
        agent_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, ActionError> {
        let wanted = keywords(query);
        let entries = lock(&self.entries);

        let mut scored: Vec<(usize, &MemoryEntry)> = entries
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .map(|e| (keywords(&e.content).intersection(&wanted).count(), e))
            .filter(|(overlap, _)| wanted.is_empty() || *overlap > 0)
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.importance.total_cmp(&a.1.importance))
                .then(b.1.created_at.cmp(&a.1.created_at))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

// =============================================================================
// Spatial
// =============================================================================

/// Undirected location graph with agent positions.
#[derive(Default)]
pub struct InMemorySpatialGraph {
    edges: Mutex<HashMap<String, Vec<String>>>,
    positions: Mutex<HashMap<String, String>>,
}

impl InMemorySpatialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect two locations in both directions.
    pub fn connect(&self, a: &str, b: &str) {
        let mut edges = lock(&self.edges);
        for (from, to) in [(a, b), (b, a)] {
            let list = edges.entry(from.to_string()).or_default();
            if !list.iter().any(|l| l == to) {
                list.push(to.to_string());
            }
        }
    }

    pub fn place(&self, agent_id: &str, location: &str) {
        lock(&self.positions).insert(agent_id.to_string(), location.to_string());
    }
}

#[async_trait]
impl SpatialGraph for InMemorySpatialGraph {
    async fn location_of(&self, agent_id: &str) -> Result<Option<String>, ActionError> {
        Ok(lock(&self.positions).get(agent_id).cloned())
    }

    async fn neighbors(&self, location: &str) -> Result<Vec<String>, ActionError> {
        Ok(lock(&self.edges).get(location).cloned().unwrap_or_default())
    }

    async fn occupants(&self, location: &str) -> Result<Vec<String>, ActionError> {
        let mut agents: Vec<String> = lock(&self.positions)
            .iter()
            .filter(|(_, loc)| loc.as_str() == location)
            .map(|(agent, _)| agent.clone())
            .collect();
        agents.sort();
        Ok(agents)
    }

    async fn move_agent(&self, agent_id: &str, destination: &str) -> Result<String, ActionError> {
        let current = lock(&self.positions)
            .get(agent_id)
            .cloned()
            .ok_or_else(|| ActionError::Failed(format!("{} has no location", agent_id)))?;

        if current == destination {
            return Ok(current);
        }

        let reachable = lock(&self.edges)
            .get(&current)
            .is_some_and(|n| n.iter().any(|l| l == destination));
        if !reachable {
            return Err(ActionError::Failed(format!(
                "{} is not reachable from {}",
                destination, current
            )));
        }

        lock(&self.positions).insert(agent_id.to_string(), destination.to_string());
        Ok(destination.to_string())
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Per-owner item counts.
#[derive(Default)]
pub struct InMemoryInventory {
    stock: Mutex<HashMap<String, BTreeMap<String, u32>>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, owner: &str, item: &str, quantity: u32) {
        let mut stock = lock(&self.stock);
        let count = stock
            .entry(owner.to_string())
            .or_default()
            .entry(item.to_string())
            .or_insert(0);
        *count = count.saturating_add(quantity);
    }

    pub fn count(&self, owner: &str, item: &str) -> u32 {
        lock(&self.stock)
            .get(owner)
            .and_then(|items| items.get(item).copied())
            .unwrap_or(0)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn items(&self, owner: &str) -> Result<Vec<ItemStack>, ActionError> {
        Ok(lock(&self.stock)
            .get(owner)
            .map(|items| {
                items
                    .iter()
                    .filter(|(_, qty)| **qty > 0)
                    .map(|(item, qty)| ItemStack {
                        item: item.clone(),
                        quantity: *qty,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn transfer(
        &self,
        from: &str,
        to: &str,
        item: &str,
        quantity: u32,
    ) -> Result<u32, ActionError> {
        let mut stock = lock(&self.stock);
        let held = stock
            .get(from)
            .and_then(|items| items.get(item).copied())
            .unwrap_or(0);
        if held < quantity {
            return Err(ActionError::Failed(format!(
                "{} has {} {}, cannot give {}",
                from, held, item, quantity
            )));
        }

        let remaining = held - quantity;
        stock
            .entry(from.to_string())
            .or_default()
            .insert(item.to_string(), remaining);
        let received = stock
            .entry(to.to_string())
            .or_default()
            .entry(item.to_string())
            .or_insert(0);
        *received = received.saturating_add(quantity);
        Ok(remaining)
    }
}

// =============================================================================
// Time
// =============================================================================

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<WorldTime>,
}

impl ManualClock {
    pub fn new(start: WorldTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }
}

#[async_trait]
impl WorldClock for ManualClock {
    async fn now(&self) -> Result<WorldTime, ActionError> {
        Ok(*lock(&self.now))
    }

    async fn advance(&self, minutes: u32) -> Result<WorldTime, ActionError> {
        let mut now = lock(&self.now);
        *now = now.advanced_by(minutes);
        Ok(*now)
    }
}

// =============================================================================
// Scenario
// =============================================================================

/// Scenario state as a flat flag map.
#[derive(Default)]
pub struct InMemoryScenario {
    name: String,
    flags: Mutex<serde_json::Map<String, serde_json::Value>>,
}

impl InMemoryScenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Mutex::new(serde_json::Map::new()),
        }
    }

    pub fn flag(&self, flag: &str) -> Option<serde_json::Value> {
        lock(&self.flags).get(flag).cloned()
    }
}

#[async_trait]
impl ScenarioState for InMemoryScenario {
    async fn snapshot(&self) -> Result<serde_json::Value, ActionError> {
        Ok(serde_json::json!({
            "scenario": self.name,
            "flags": serde_json::Value::Object(lock(&self.flags).clone()),
        }))
    }

    async fn set_flag(&self, flag: &str, value: serde_json::Value) -> Result<(), ActionError> {
        lock(&self.flags).insert(flag.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// Directory
// =============================================================================

/// Fixed set of agent profiles keyed by id.
#[derive(Default)]
pub struct InMemoryDirectory {
    profiles: Mutex<HashMap<String, AgentProfile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: AgentProfile) {
        lock(&self.profiles).insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl AgentDirectory for InMemoryDirectory {
    async fn lookup(&self, agent_id: &str) -> Result<Option<AgentProfile>, ActionError> {
        Ok(lock(&self.profiles).get(agent_id).cloned())
    }
}

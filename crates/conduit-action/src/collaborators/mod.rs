//! Contracts for the domain managers built-in actions call into.
//!
//! The engine only knows these traits. Concrete stores are injected once at
//! construction through [`Collaborators`]; an action whose collaborator is
//! missing fails fast with `ActionError::UnavailableDependency`.

pub mod in_memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ActionError;

// =============================================================================
// Value types
// =============================================================================

/// A memory stored on behalf of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub agent_id: String,
    pub content: String,
    pub importance: f32,
    pub created_at: Timestamp,
}

/// A quantity of one item held by an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub quantity: u32,
}

/// Public profile of an agent known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub traits: Vec<String>,
}

/// In-world time of day, counted in days since the scenario began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldTime {
    pub day: u32,
    pub hour: u8,
    pub minute: u8,
}

impl WorldTime {
    pub fn new(day: u32, hour: u8, minute: u8) -> Self {
        Self { day, hour, minute }
    }

    /// The time `minutes` later, rolling over hours and days.
    pub fn advanced_by(&self, minutes: u32) -> Self {
        let total = u64::from(self.hour) * 60 + u64::from(self.minute) + u64::from(minutes);
        let days = total / (24 * 60);
        let rest = total % (24 * 60);
        Self {
            day: self.day.saturating_add(u32::try_from(days).unwrap_or(u32::MAX)),
            hour: (rest / 60) as u8,
            minute: (rest % 60) as u8,
        }
    }

    /// Coarse period label used in agent-facing text.
    pub fn period(&self) -> &'static str {
        match self.hour {
            5..=11 => "morning",
            12..=16 => "afternoon",
            17..=20 => "evening",
            _ => "night",
        }
    }
}

impl fmt::Display for WorldTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}, {:02}:{:02}", self.day, self.hour, self.minute)
    }
}

// =============================================================================
// Contracts
// =============================================================================

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn store(
        &self,
        agent_id: &str,
        content: &str,
        importance: f32,
    ) -> Result<MemoryEntry, ActionError>;

    /// Memories of `agent_id` relevant to `query`, best first.
    async fn search(
        &self,
        agent_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, ActionError>;
}

#[async_trait]
pub trait SpatialGraph: Send + Sync {
    async fn location_of(&self, agent_id: &str) -> Result<Option<String>, ActionError>;

    async fn neighbors(&self, location: &str) -> Result<Vec<String>, ActionError>;

    async fn occupants(&self, location: &str) -> Result<Vec<String>, ActionError>;

    /// Move an agent to an adjacent location, returning where it ended up.
    async fn move_agent(&self, agent_id: &str, destination: &str) -> Result<String, ActionError>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn items(&self, owner: &str) -> Result<Vec<ItemStack>, ActionError>;

    /// Move `quantity` of `item` between owners, returning what `from` has left.
    async fn transfer(
        &self,
        from: &str,
        to: &str,
        item: &str,
        quantity: u32,
    ) -> Result<u32, ActionError>;
}

#[async_trait]
pub trait WorldClock: Send + Sync {
    async fn now(&self) -> Result<WorldTime, ActionError>;

    async fn advance(&self, minutes: u32) -> Result<WorldTime, ActionError>;
}

#[async_trait]
pub trait ScenarioState: Send + Sync {
    async fn snapshot(&self) -> Result<serde_json::Value, ActionError>;

    async fn set_flag(&self, flag: &str, value: serde_json::Value) -> Result<(), ActionError>;
}

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn lookup(&self, agent_id: &str) -> Result<Option<AgentProfile>, ActionError>;
}

// =============================================================================
// Injection
// =============================================================================

/// The set of collaborators available to built-in actions.
///
/// Every field is optional; absent collaborators make the actions that need
/// them fail with `UnavailableDependency` instead of panicking.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub memory: Option<Arc<dyn MemoryStore>>,
    pub spatial: Option<Arc<dyn SpatialGraph>>,
    pub inventory: Option<Arc<dyn InventoryStore>>,
    pub clock: Option<Arc<dyn WorldClock>>,
    pub scenario: Option<Arc<dyn ScenarioState>>,
    pub directory: Option<Arc<dyn AgentDirectory>>,
}

fn unavailable(name: &str) -> ActionError {
    ActionError::UnavailableDependency(name.to_string())
}

impl Collaborators {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_spatial(mut self, spatial: Arc<dyn SpatialGraph>) -> Self {
        self.spatial = Some(spatial);
        self
    }

    pub fn with_inventory(mut self, inventory: Arc<dyn InventoryStore>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn WorldClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_scenario(mut self, scenario: Arc<dyn ScenarioState>) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn AgentDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn memory(&self) -> Result<&Arc<dyn MemoryStore>, ActionError> {
        self.memory.as_ref().ok_or_else(|| unavailable("memory store"))
    }

    pub fn spatial(&self) -> Result<&Arc<dyn SpatialGraph>, ActionError> {
        self.spatial.as_ref().ok_or_else(|| unavailable("spatial graph"))
    }

    pub fn inventory(&self) -> Result<&Arc<dyn InventoryStore>, ActionError> {
        self.inventory.as_ref().ok_or_else(|| unavailable("inventory store"))
    }

    pub fn clock(&self) -> Result<&Arc<dyn WorldClock>, ActionError> {
        self.clock.as_ref().ok_or_else(|| unavailable("world clock"))
    }

    pub fn scenario(&self) -> Result<&Arc<dyn ScenarioState>, ActionError> {
        self.scenario.as_ref().ok_or_else(|| unavailable("scenario state"))
    }

    pub fn directory(&self) -> Result<&Arc<dyn AgentDirectory>, ActionError> {
        self.directory.as_ref().ok_or_else(|| unavailable("agent directory"))
    }

    /// Names of the collaborators currently injected.
    pub fn available(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.memory.is_some() {
            names.push("memory store");
        }
        if self.spatial.is_some() {
            names.push("spatial graph");
        }
        if self.inventory.is_some() {
            names.push("inventory store");
        }
        if self.clock.is_some() {
            names.push("world clock");
        }
        if self.scenario.is_some() {
            names.push("scenario state");
        }
        if self.directory.is_some() {
            names.push("agent directory");
        }
        names
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("available", &self.available())
            .finish()
    }
}

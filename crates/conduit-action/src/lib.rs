//! Action dispatch engine for Conduit.
//!
//! Holds the registry of named actions, admits executions against a
//! concurrency cap, races them against their timeouts, and reports each
//! step as a lifecycle event. Built-in actions reach the world only through
//! the collaborator contracts in [`collaborators`].

pub mod collaborators;
pub mod engine;
pub mod error;
pub mod events;
pub mod handler;
pub mod registry;
pub mod tracker;
pub mod types;

pub use collaborators::Collaborators;
pub use engine::ActionEngine;
pub use error::{ActionError, DispatchError};
pub use events::{BroadcastListener, EventBus, EventListener, ListenerId};
pub use handler::{ActionCancel, ActionDefinition, ActionHandler, ActionMonitor};
pub use registry::{ActionRegistry, RegisteredAction};
pub use tracker::ExecutionTracker;
pub use types::{
    CallerContext, ExecutionContext, ExecutionRecord, ExecutionState, MonitorVerdict, Validation,
};

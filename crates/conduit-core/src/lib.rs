//! Shared building blocks for Conduit: configuration, errors, timestamps
//! and the lifecycle event model emitted by the dispatch engine.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::ConduitConfig;
pub use error::{ConduitError, Result};
pub use events::{EventKind, LifecycleEvent};
pub use types::*;

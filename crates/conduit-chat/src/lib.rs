//! Command resolution for Conduit.
//!
//! Extracts action invocations from free-form responder text, runs them
//! through the dispatch engine and feeds the outcomes back until the
//! responder stops asking for actions.

pub mod conversation;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod resolver;
pub mod responder;

pub use conversation::{ChatTurn, Conversation, Role};
pub use error::ChatError;
pub use formatter::{JsonFormatter, MessageFormatter};
pub use parser::{CommandParser, ParsedCommand};
pub use resolver::{Outcome, Resolution, ResolutionLoop};
pub use responder::{Responder, ScriptedResponder};

//! Rendering of loop outcomes into conversation notes.

use conduit_action::collaborators::AgentProfile;
use conduit_action::RegisteredAction;
use serde_json::Value;

/// Turns results, errors and lookups into the text fed back to the responder.
pub trait MessageFormatter: Send + Sync {
    fn format_result(&self, action: &str, result: &Value) -> String;

    fn format_error(&self, message: &str) -> String;

    fn format_definition(&self, action: &RegisteredAction) -> String;

    fn format_agent(&self, profile: &AgentProfile) -> String;
}

/// Compact JSON for data, `Error: <message>` for failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl MessageFormatter for JsonFormatter {
    fn format_result(&self, _action: &str, result: &Value) -> String {
        result.to_string()
    }

    fn format_error(&self, message: &str) -> String {
        format!("Error: {}", message)
    }

    fn format_definition(&self, action: &RegisteredAction) -> String {
        action.describe().to_string()
    }

    fn format_agent(&self, profile: &AgentProfile) -> String {
        serde_json::to_string(profile).unwrap_or_else(|e| self.format_error(&e.to_string()))
    }
}

//! Command protocol parser.
//!
//! Finds action invocations embedded in free-form responder text. Three
//! forms are recognized, checked in fixed priority order:
//!
//! 1. `action-execute <name> <json-object>`
//! 2. `action-describe <name>`
//! 3. `agent-lookup <identifier>`
//!
//! A higher-priority form wins even when a lower-priority one appears
//! earlier in the text. Markers are case-insensitive and tokens may be
//! separated by any whitespace, newlines included.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// =============================================================================
// Compiled patterns
// =============================================================================

struct CommandPatterns {
    execute: Regex,
    describe: Regex,
    agent_lookup: Regex,
}

static COMMAND_PATTERNS: LazyLock<CommandPatterns> = LazyLock::new(|| {
    let mk = |p: &str| Regex::new(p).expect("Invalid command regex");
    CommandPatterns {
        execute: mk(r"(?i)\baction-execute\s+([A-Za-z0-9_-]+)"),
        describe: mk(r"(?i)\baction-describe\s+([A-Za-z0-9_-]+)"),
        agent_lookup: mk(r"(?i)\bagent-lookup\s+([A-Za-z0-9_-]+)"),
    }
});

// =============================================================================
// ParsedCommand
// =============================================================================

/// What the parser found in a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    /// Plain text, no command.
    None,
    Execute { action: String, params: Value },
    Describe { action: String },
    AgentLookup { agent_id: String },
    /// An execute marker whose arguments could not be read.
    Malformed { action: String, error: String },
}

impl ParsedCommand {
    pub fn is_command(&self) -> bool {
        !matches!(self, ParsedCommand::None)
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedCommand::None => "none",
            ParsedCommand::Execute { .. } => "execute",
            ParsedCommand::Describe { .. } => "describe",
            ParsedCommand::AgentLookup { .. } => "agent_lookup",
            ParsedCommand::Malformed { .. } => "malformed",
        }
    }
}

// =============================================================================
// CommandParser
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract the first command from `text`. Never fails.
    pub fn parse(&self, text: &str) -> ParsedCommand {
        let patterns = &*COMMAND_PATTERNS;

        if let Some(caps) = patterns.execute.captures(text) {
            let name = &caps[1];
            let rest = &text[caps.get(0).map_or(0, |m| m.end())..];
            return match extract_object(rest) {
                Ok(params) => ParsedCommand::Execute {
                    action: name.to_string(),
                    params,
                },
                Err(error) => ParsedCommand::Malformed {
                    action: name.to_string(),
                    error: format!("invalid arguments for {}: {}", name, error),
                },
            };
        }

        if let Some(caps) = patterns.describe.captures(text) {
            return ParsedCommand::Describe {
                action: caps[1].to_string(),
            };
        }

        if let Some(caps) = patterns.agent_lookup.captures(text) {
            return ParsedCommand::AgentLookup {
                agent_id: caps[1].to_string(),
            };
        }

        ParsedCommand::None
    }
}

/// The shortest `{ ... }` span that parses as a JSON object. The object must
/// open right after the action name, separated only by whitespace.
fn extract_object(text: &str) -> Result<Value, String> {
    let candidate = text.trim_start();
    if !candidate.starts_with('{') {
        return Err("expected a JSON object after the action name".to_string());
    }

    let mut last_error = None;
    for (close, _) in candidate.match_indices('}') {
        match serde_json::from_str::<Value>(&candidate[..=close]) {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(_) => {}
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(match last_error {
        Some(e) => format!("no valid JSON object found ({})", e),
        None => "unterminated JSON object".to_string(),
    })
}

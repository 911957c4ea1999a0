//! Conversation state shared between the resolution loop and a responder.

use std::fmt;

use conduit_action::CallerContext;
use conduit_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Notes produced by the loop: action results, errors, lookups.
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub created_at: Timestamp,
}

/// Ordered transcript of one agent's session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// The agent whose responses drive this conversation.
    pub agent_id: Option<String>,
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new(agent_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            turns: Vec::new(),
        }
    }

    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        Self::new(Some(agent_id.into()))
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            content: content.into(),
            created_at: Timestamp::now(),
        });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content);
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.push(Role::System, content);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Caller context for actions dispatched from this conversation.
    pub fn caller(&self) -> CallerContext {
        CallerContext {
            agent_id: self.agent_id.clone(),
            session_id: Some(self.id),
            ..CallerContext::default()
        }
    }

    /// Plain-text rendering, one `role: content` line per turn.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

//! The opaque text source driving the resolution loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::conversation::Conversation;
use crate::error::ChatError;

/// Produces the next piece of text given the conversation so far.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, conversation: &Conversation) -> Result<String, ChatError>;
}

/// Replays a fixed list of replies, then answers with empty text.
#[derive(Debug, Default)]
pub struct ScriptedResponder {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedResponder {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Build from a JSON array of strings.
    pub fn from_json(json: &str) -> Result<Self, ChatError> {
        let replies: Vec<String> = serde_json::from_str(json)
            .map_err(|e| ChatError::Parse(format!("script must be a JSON array of strings: {}", e)))?;
        Ok(Self::new(replies))
    }

    /// Number of times `respond` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn respond(&self, _conversation: &Conversation) -> Result<String, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_default())
    }
}

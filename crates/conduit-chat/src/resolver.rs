//! Command resolution loop.
//!
//! Feeds responder text through the parser, runs whatever command it
//! contains, appends the outcome to the conversation as a system note and
//! asks the responder for the next text. Stops when a reply contains no
//! command, when a reply is empty, or after `max_depth` follow-ups.
//!
//! Dispatch and parse failures are conversational: they become notes the
//! responder can react to. Only responder failures and an uninitialized
//! engine abort the loop.

use std::sync::Arc;

use conduit_action::{ActionEngine, DispatchError};
use conduit_core::config::ResolverConfig;
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::error::ChatError;
use crate::formatter::{JsonFormatter, MessageFormatter};
use crate::parser::{CommandParser, ParsedCommand};
use crate::responder::Responder;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The latest reply contained no command.
    Completed,
    /// The latest reply was empty.
    NoResponse,
    /// `max_depth` follow-ups were requested and the reply still held a command.
    DepthExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: Outcome,
    /// Final text for the caller.
    pub text: String,
    /// Follow-ups requested from the responder.
    pub depth: usize,
    /// Commands handled along the way.
    pub commands: usize,
}

pub struct ResolutionLoop {
    engine: Arc<ActionEngine>,
    responder: Arc<dyn Responder>,
    formatter: Arc<dyn MessageFormatter>,
    parser: CommandParser,
    config: ResolverConfig,
}

impl ResolutionLoop {
    pub fn new(
        engine: Arc<ActionEngine>,
        responder: Arc<dyn Responder>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            engine,
            responder,
            formatter: Arc::new(JsonFormatter),
            parser: CommandParser::new(),
            config,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Resolve with the configured `max_depth`.
    pub async fn resolve(
        &self,
        initial_response: &str,
        conversation: &mut Conversation,
    ) -> Result<Resolution, ChatError> {
        self.resolve_with_depth(initial_response, conversation, self.config.max_depth)
            .await
    }

    pub async fn resolve_with_depth(
        &self,
        initial_response: &str,
        conversation: &mut Conversation,
        max_depth: usize,
    ) -> Result<Resolution, ChatError> {
        if !self.engine.is_initialized() {
            return Err(ChatError::Dispatch(DispatchError::NotInitialized));
        }

        let mut text = initial_response.to_string();
        let mut depth = 0;
        let mut commands = 0;

        loop {
            let latest = text.trim();
            if latest.is_empty() {
                tracing::debug!(depth, "Responder produced no text");
                return Ok(Resolution {
                    outcome: Outcome::NoResponse,
                    text: self.config.no_response_text.clone(),
                    depth,
                    commands,
                });
            }

            let command = self.parser.parse(latest);
            conversation.push_assistant(latest);

            if !command.is_command() {
                return Ok(Resolution {
                    outcome: Outcome::Completed,
                    text: latest.to_string(),
                    depth,
                    commands,
                });
            }

            if depth >= max_depth {
                tracing::warn!(max_depth, commands, "Resolution depth exhausted");
                conversation.push_system(self.config.depth_exhausted_text.clone());
                return Ok(Resolution {
                    outcome: Outcome::DepthExhausted,
                    text: latest.to_string(),
                    depth,
                    commands,
                });
            }

            tracing::debug!(depth, command = command.kind(), "Handling command");
            let note = self.handle(command, conversation).await?;
            conversation.push_system(note);
            commands += 1;

            text = self.responder.respond(conversation).await?;
            depth += 1;
        }
    }

    /// Run one command and render its outcome as a note.
    ///
    /// Only an engine that stopped being initialized is an error here.
    async fn handle(
        &self,
        command: ParsedCommand,
        conversation: &Conversation,
    ) -> Result<String, ChatError> {
        let fmt = &self.formatter;
        let note = match command {
            ParsedCommand::Execute { action, params } => {
                match self
                    .engine
                    .dispatch(&action, params, &conversation.caller())
                    .await
                {
                    Ok(result) => fmt.format_result(&action, &result),
                    Err(DispatchError::NotInitialized) => {
                        return Err(ChatError::Dispatch(DispatchError::NotInitialized))
                    }
                    Err(e) => fmt.format_error(&e.to_string()),
                }
            }
            ParsedCommand::Describe { action } => match self.engine.get_action(&action)? {
                Some(registered) => fmt.format_definition(&registered),
                None => fmt.format_error(&DispatchError::ActionNotFound(action).to_string()),
            },
            ParsedCommand::AgentLookup { agent_id } => {
                let directory = match self.engine.collaborators().directory() {
                    Ok(directory) => directory,
                    Err(e) => return Ok(fmt.format_error(&e.to_string())),
                };
                match directory.lookup(&agent_id).await {
                    Ok(Some(profile)) => fmt.format_agent(&profile),
                    Ok(None) => fmt.format_error(&format!("Agent not found: {}", agent_id)),
                    Err(e) => fmt.format_error(&e.to_string()),
                }
            }
            ParsedCommand::Malformed { error, .. } => fmt.format_error(&error),
            ParsedCommand::None => String::new(),
        };
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::ScriptedResponder;
    use conduit_action::Collaborators;
    use conduit_core::config::EngineConfig;

    fn engine() -> Arc<ActionEngine> {
        let engine = ActionEngine::new(EngineConfig::default(), Collaborators::none());
        engine.initialize().unwrap();
        Arc::new(engine)
    }

    fn looper(replies: Vec<&str>) -> (ResolutionLoop, Arc<ScriptedResponder>) {
        let responder = Arc::new(ScriptedResponder::new(replies));
        let lp = ResolutionLoop::new(engine(), responder.clone(), ResolverConfig::default());
        (lp, responder)
    }

    #[tokio::test]
    async fn test_plain_text_completes_immediately() {
        let (lp, responder) = looper(vec![]);
        let mut conv = Conversation::for_agent("ada");
        let res = lp.resolve("  Good morning!  ", &mut conv).await.unwrap();
        assert_eq!(res.outcome, Outcome::Completed);
        assert_eq!(res.text, "Good morning!");
        assert_eq!(res.depth, 0);
        assert_eq!(responder.calls(), 0);
        assert_eq!(conv.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_initial_is_no_response() {
        let (lp, _) = looper(vec![]);
        let mut conv = Conversation::new(None);
        let res = lp.resolve("   \n ", &mut conv).await.unwrap();
        assert_eq!(res.outcome, Outcome::NoResponse);
        assert_eq!(res.text, "<no response>");
        assert!(conv.is_empty());
    }

    #[tokio::test]
    async fn test_execute_then_complete() {
        let (lp, responder) = looper(vec!["It echoed back."]);
        let mut conv = Conversation::for_agent("ada");
        let res = lp
            .resolve(r#"action-execute echo {"text": "ping"}"#, &mut conv)
            .await
            .unwrap();

        assert_eq!(res.outcome, Outcome::Completed);
        assert_eq!(res.text, "It echoed back.");
        assert_eq!((res.depth, res.commands), (1, 1));
        assert_eq!(responder.calls(), 1);
        assert_eq!(conv.turns()[1].content, r#"{"success":true,"text":"ping"}"#);
    }

    #[tokio::test]
    async fn test_dispatch_error_becomes_note() {
        let (lp, _) = looper(vec!["Oh well."]);
        let mut conv = Conversation::for_agent("ada");
        let res = lp
            .resolve(r#"action-execute fly {"to": "moon"}"#, &mut conv)
            .await
            .unwrap();
        assert_eq!(res.outcome, Outcome::Completed);
        assert_eq!(conv.turns()[1].content, "Error: Action not found: fly");
    }

    #[tokio::test]
    async fn test_depth_bound_is_exact() {
        let malformed = "action-execute echo {broken";
        let (lp, responder) = looper(vec![malformed; 50]);
        let mut conv = Conversation::for_agent("ada");
        let res = lp.resolve_with_depth(malformed, &mut conv, 5).await.unwrap();

        assert_eq!(res.outcome, Outcome::DepthExhausted);
        assert_eq!(res.text, malformed);
        assert_eq!(res.depth, 5);
        assert_eq!(responder.calls(), 5);
        assert_eq!(conv.last().unwrap().content, "max recursion depth reached");
    }

    #[tokio::test]
    async fn test_zero_depth_never_calls_responder() {
        let (lp, responder) = looper(vec!["unused"]);
        let mut conv = Conversation::for_agent("ada");
        let res = lp
            .resolve_with_depth("action-describe echo", &mut conv, 0)
            .await
            .unwrap();
        assert_eq!(res.outcome, Outcome::DepthExhausted);
        assert_eq!(responder.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_follow_up_is_no_response() {
        let (lp, _) = looper(vec![]);
        let mut conv = Conversation::for_agent("ada");
        let res = lp.resolve("action-describe echo", &mut conv).await.unwrap();
        assert_eq!(res.outcome, Outcome::NoResponse);
        assert_eq!(res.depth, 1);
    }

    #[tokio::test]
    async fn test_agent_lookup_without_directory() {
        let (lp, _) = looper(vec!["fine"]);
        let mut conv = Conversation::for_agent("ada");
        lp.resolve("agent-lookup bo", &mut conv).await.unwrap();
        assert_eq!(
            conv.turns()[1].content,
            "Error: Dependency unavailable: agent directory"
        );
    }

    #[tokio::test]
    async fn test_uninitialized_engine_is_fatal() {
        let engine = Arc::new(ActionEngine::new(EngineConfig::default(), Collaborators::none()));
        let lp = ResolutionLoop::new(
            engine,
            Arc::new(ScriptedResponder::new(Vec::<String>::new())),
            ResolverConfig::default(),
        );
        let mut conv = Conversation::new(None);
        let err = lp.resolve("hello", &mut conv).await.unwrap_err();
        assert!(matches!(err, ChatError::Dispatch(DispatchError::NotInitialized)));
    }

    /// Shuts the engine down before handing back its reply.
    struct ShutdownResponder {
        engine: Arc<ActionEngine>,
        reply: &'static str,
    }

    #[async_trait::async_trait]
    impl Responder for ShutdownResponder {
        async fn respond(&self, _conversation: &Conversation) -> Result<String, ChatError> {
            self.engine.shutdown();
            Ok(self.reply.to_string())
        }
    }

    #[tokio::test]
    async fn test_engine_shutdown_mid_loop_is_fatal() {
        for reply in [r#"action-execute echo {"text": "again"}"#, "action-describe echo"] {
            let engine = engine();
            let lp = ResolutionLoop::new(
                engine.clone(),
                Arc::new(ShutdownResponder {
                    engine: engine.clone(),
                    reply,
                }),
                ResolverConfig::default(),
            );
            let mut conv = Conversation::for_agent("ada");
            let err = lp
                .resolve(r#"action-execute echo {"text": "first"}"#, &mut conv)
                .await
                .unwrap_err();
            assert!(matches!(err, ChatError::Dispatch(DispatchError::NotInitialized)));
            // The first command still produced its note.
            assert_eq!(conv.turns()[1].content, r#"{"success":true,"text":"first"}"#);
        }
    }

    struct FailingResponder;

    #[async_trait::async_trait]
    impl Responder for FailingResponder {
        async fn respond(&self, _conversation: &Conversation) -> Result<String, ChatError> {
            Err(ChatError::Responder("upstream closed".into()))
        }
    }

    #[tokio::test]
    async fn test_responder_error_aborts() {
        let lp = ResolutionLoop::new(engine(), Arc::new(FailingResponder), ResolverConfig::default());
        let mut conv = Conversation::for_agent("ada");
        let err = lp
            .resolve(r#"action-execute echo {"text": "x"}"#, &mut conv)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Responder(_)));
    }
}

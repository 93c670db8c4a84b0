//! Conversation orchestration
//!
//! One call per incoming message, processed to completion before the next
//! message for the same session is accepted:
//!
//! 1. load (or create) the session and append the user message
//! 2. classify the message against the active agent
//! 3. on a transfer, run the handoff and answer with its announcement;
//!    the model is not called this turn
//! 4. otherwise invoke the model for the active agent with the full history
//!    and append its reply
//! 5. save the session
//!
//! Every per-turn error is turned into a visible reply here. A failed turn
//! keeps the user's message in history but never the agent reply, and never
//! changes the active agent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::agents::AgentRegistry;
use crate::error::RoutingError;
use crate::handoff::HandoffCoordinator;
use crate::intent::IntentClassifier;
use crate::invocation::ModelInvocation;
use crate::session::{Session, SessionStore};
use crate::transport::ChatTransport;
use crate::types::{Message, MessageKind, OutgoingMessage};

/// Prefix of every error-surfaced reply
pub const ERROR_PREFIX: &str = "Error: ";

/// Reply shown when a handoff target cannot be resolved
pub const TRANSFER_FAILED_REPLY: &str = "Error: unable to transfer your request right now.";

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on one model call; `None` waits indefinitely
    pub model_timeout: Option<Duration>,
    /// Placeholder shown while the model is working
    pub thinking_text: String,
    /// First message of every conversation
    pub greeting: String,
    /// Author shown on outgoing messages
    pub author: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model_timeout: Some(Duration::from_secs(120)),
            thinking_text: "Thinking...".to_string(),
            greeting: "Hello, I am your career mentor agent. You may ask anything regarding your career."
                .to_string(),
            author: "mentor".to_string(),
        }
    }
}

/// Which branch a turn took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The active agent answered through the model
    Responded,
    /// Control moved to another agent; no model call was made
    Transferred { from: String, to: String },
    /// The turn failed and the reply carries the error
    Failed,
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub content: String,
    pub outcome: TurnOutcome,
}

impl TurnReply {
    fn failed(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            outcome: TurnOutcome::Failed,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Transferred { .. })
    }
}

/// Routes each message to the active agent or hands the conversation off
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    classifier: IntentClassifier,
    coordinator: HandoffCoordinator,
    sessions: SessionStore,
    model: Arc<dyn ModelInvocation>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator whose routes come from the registry's trigger phrases
    pub fn new(registry: Arc<AgentRegistry>, model: Arc<dyn ModelInvocation>) -> Self {
        let classifier = IntentClassifier::from_registry(&registry);
        let sessions = SessionStore::new(registry.entry_agent_name());
        let coordinator = HandoffCoordinator::new(Arc::clone(&registry));
        info!(
            "Orchestrator ready: {} agents, {} routable, entry '{}'",
            registry.len(),
            classifier.targets().len(),
            registry.entry_agent_name()
        );
        Self {
            registry,
            classifier,
            coordinator,
            sessions,
            model,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the route table
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the session for a new conversation and return the greeting
    pub async fn start_conversation(&self, session_id: &str) -> String {
        let _turn = self.sessions.lock_turn(session_id).await;
        let session = self.sessions.get_or_create(session_id).await;
        self.sessions.save(session_id, session).await;
        self.config.greeting.clone()
    }

    /// Destroy a session; returns whether it existed
    pub async fn end_conversation(&self, session_id: &str) -> bool {
        let turn = self.sessions.lock_turn(session_id).await;
        let existed = self.sessions.remove(session_id).await.is_some();
        self.sessions.release_turn(session_id, turn).await;
        existed
    }

    /// Handle one user message and return the reply text
    pub async fn handle_message(&self, session_id: &str, user_text: &str) -> String {
        self.handle_turn(session_id, user_text).await.content
    }

    /// Handle one user message, reporting which branch the turn took
    pub async fn handle_turn(&self, session_id: &str, user_text: &str) -> TurnReply {
        let _turn = self.sessions.lock_turn(session_id).await;
        let mut session = self.sessions.get_or_create(session_id).await;

        session.append(Message::user(user_text));

        let decision = self.classifier.classify(user_text, &session.active_agent);
        let reply = match decision.target() {
            Some(target) => self.transfer(&mut session, target),
            None => self.respond(&mut session).await,
        };

        debug_assert!(
            self.registry.contains(&session.active_agent),
            "active agent must be registered"
        );

        session.touch();
        self.sessions.save(session_id, session).await;
        reply
    }

    /// Run a turn with an interim placeholder: send `thinking_text`, handle
    /// the message, then overwrite the placeholder with the reply.
    pub async fn deliver_turn(
        &self,
        transport: &dyn ChatTransport,
        session_id: &str,
        user_text: &str,
    ) -> Result<TurnReply> {
        let placeholder = transport
            .send(OutgoingMessage::new(
                self.config.thinking_text.clone(),
                self.config.author.clone(),
                MessageKind::Placeholder,
            ))
            .await?;

        let reply = self.handle_turn(session_id, user_text).await;
        transport.update(&placeholder, &reply.content).await?;
        Ok(reply)
    }

    fn transfer(&self, session: &mut Session, target: &str) -> TurnReply {
        let from = session.active_agent.clone();
        match self.coordinator.execute(session, target) {
            Ok(notice) => {
                let content = notice.content.clone();
                session.append(notice);
                TurnReply {
                    content,
                    outcome: TurnOutcome::Transferred {
                        from,
                        to: session.active_agent.clone(),
                    },
                }
            }
            Err(e) => {
                error!("Session '{}': transfer aborted: {}", session.id, e);
                TurnReply::failed(TRANSFER_FAILED_REPLY)
            }
        }
    }

    async fn respond(&self, session: &mut Session) -> TurnReply {
        let agent = match self.registry.lookup(&session.active_agent) {
            Ok(agent) => agent,
            Err(e) => {
                error!("Session '{}': {}", session.id, e);
                return TurnReply::failed(format!("{}{}", ERROR_PREFIX, e));
            }
        };

        debug!(
            "Session '{}': '{}' answering with {} history entries",
            session.id,
            agent.name,
            session.history.len()
        );

        let invocation = self.model.invoke(&agent, &session.history);
        let result = match self.config.model_timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .unwrap_or(Err(RoutingError::Timeout(limit))),
            None => invocation.await,
        };

        match result {
            Ok(text) => {
                session.append(Message::agent(text.clone()));
                TurnReply {
                    content: text,
                    outcome: TurnOutcome::Responded,
                }
            }
            Err(e) => {
                if e.is_model_failure() {
                    warn!("Session '{}': model call for '{}' failed: {}", session.id, agent.name, e);
                } else {
                    error!("Session '{}': '{}' could not answer: {}", session.id, agent.name, e);
                }
                TurnReply::failed(format!("{}{}", ERROR_PREFIX, e))
            }
        }
    }

    /// Snapshot of a session's state
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).await
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}

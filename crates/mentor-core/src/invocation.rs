//! Model invocation: the narrow seam between the routing core and the LLM

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::agents::AgentProfile;
use crate::context::build_system_prompt;
use crate::error::{Result, RoutingError};
use crate::providers::{ChatMessage, ChatRole, ModelRouter};
use crate::types::{Message, Role};

/// Produces a reply attributable to `agent`, given the full session history
#[async_trait]
pub trait ModelInvocation: Send + Sync {
    async fn invoke(&self, agent: &AgentProfile, history: &[Message]) -> Result<String>;
}

/// [`ModelInvocation`] backed by a [`ModelRouter`]
pub struct ProviderInvocation {
    router: ModelRouter,
}

impl ProviderInvocation {
    pub fn new(router: ModelRouter) -> Self {
        Self { router }
    }

    pub fn model(&self) -> &str {
        self.router.model()
    }
}

#[async_trait]
impl ModelInvocation for ProviderInvocation {
    async fn invoke(&self, agent: &AgentProfile, history: &[Message]) -> Result<String> {
        let system = build_system_prompt(agent);
        let messages = to_chat_messages(history);

        debug!(
            "Invoking {} for '{}' with {} history entries",
            self.router.model(),
            agent.name,
            messages.len()
        );

        let response = self
            .router
            .chat(&messages, &system)
            .await
            .map_err(|e| RoutingError::model(format!("{:#}", e)))?;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(RoutingError::model(format!(
                "{} returned an empty response",
                self.router.provider_name()
            )));
        }

        if response.is_truncated() {
            warn!("'{}' reply was cut off at the token limit", agent.name);
        }

        info!(
            "'{}' replied ({} chars, {} tokens)",
            agent.name,
            text.len(),
            response.usage.total_tokens()
        );

        Ok(text.to_string())
    }
}

/// Map role-tagged history onto wire roles, keeping append order.
/// Transfer notices were shown on the assistant side, so they replay as such.
pub fn to_chat_messages(history: &[Message]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => ChatRole::User,
                Role::Agent | Role::SystemNotice => ChatRole::Assistant,
            };
            ChatMessage::new(role, m.content.clone())
        })
        .collect()
}

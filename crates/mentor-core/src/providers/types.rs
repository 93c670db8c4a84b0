//! Types shared by every provider

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Wire-side speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    /// Output was cut off at `max_tokens`
    MaxTokens,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChatUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl ChatUsage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// What a provider sends back for one request
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: ChatUsage,
}

impl ChatResponse {
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Non-success HTTP answer from a provider
#[derive(Debug, thiserror::Error)]
#[error("{provider} returned status {status}: {detail}")]
pub struct ProviderStatusError {
    pub provider: String,
    pub status: reqwest::StatusCode,
    pub detail: String,
}

impl ProviderStatusError {
    /// Quota exhaustion and server-side failures
    pub fn is_transient(&self) -> bool {
        self.status == reqwest::StatusCode::TOO_MANY_REQUESTS || self.status.is_server_error()
    }
}

/// A chat-completion backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Label used in logs and errors, e.g. "gemini"
    fn provider_name(&self) -> &str;

    fn model(&self) -> &str;

    /// Answer `messages` under the `system` prompt; an empty prompt is omitted
    async fn chat(&self, messages: &[ChatMessage], system: &str) -> Result<ChatResponse>;
}

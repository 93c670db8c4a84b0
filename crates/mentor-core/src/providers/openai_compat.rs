//! Chat completions over the OpenAI wire format
//!
//! Gemini exposes an OpenAI-compatible endpoint, which is what the mentor
//! talks to by default. Any other server speaking `/chat/completions`
//! (OpenAI, Groq, a local Ollama) can be configured as a fallback.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::{
    ChatMessage, ChatResponse, ChatRole, ChatUsage, LlmProvider, ProviderStatusError, StopReason,
};

/// Gemini's OpenAI-compatible endpoint
pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiCompatProvider {
    name: String,
    client: Client,
    api_key: String,
    /// Endpoint root without the `/chat/completions` suffix or a trailing slash
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatProvider {
    pub fn new(
        name: String,
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            name,
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage], system: &'a str) -> CompletionRequest<'a> {
        let system_turn = (!system.is_empty()).then_some(WireMessage {
            role: ChatRole::System,
            content: system,
        });
        CompletionRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: system_turn
                .into_iter()
                .chain(messages.iter().map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                }))
                .collect(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage], system: &str) -> Result<ChatResponse> {
        let body = self.request(messages, system);
        debug!(
            "POST {} (model={}, {} messages)",
            self.endpoint(),
            self.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} request could not be sent", self.name))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(ProviderStatusError {
                provider: self.name.clone(),
                status,
                detail: error_detail(&raw),
            }
            .into());
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .with_context(|| format!("{} sent an unreadable completion", self.name))?;

        ChatResponse::try_from(completion)
    }
}

/// Pull `error.message` (and `error.status`) out of an error body, falling
/// back to the raw text
fn error_detail(raw: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(ErrorEnvelope { error }) => match error.status {
            Some(status) => format!("{} ({})", error.message, status),
            None => error.message,
        },
        Err(_) if raw.trim().is_empty() => "no error body".to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

impl From<WireUsage> for ChatUsage {
    fn from(u: WireUsage) -> Self {
        Self {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }
    }
}

impl TryFrom<CompletionResponse> for ChatResponse {
    type Error = anyhow::Error;

    fn try_from(resp: CompletionResponse) -> Result<Self> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("completion contained no choices"))?;

        Ok(Self {
            text: choice.message.content.unwrap_or_default(),
            stop_reason: match choice.finish_reason.as_deref() {
                Some("stop") => StopReason::EndTurn,
                Some("length") => StopReason::MaxTokens,
                _ => StopReason::Unknown,
            },
            usage: resp.usage.map(ChatUsage::from).unwrap_or_default(),
        })
    }
}

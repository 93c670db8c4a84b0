//! LLM provider layer
//!
//! Providers implement the [`LlmProvider`] trait; [`ModelRouter`] composes them
//! with retry and failover. Any endpoint speaking the OpenAI chat completions
//! format is reachable through [`OpenAiCompatProvider`].

pub mod openai_compat;
pub mod router;
pub mod types;

pub use openai_compat::{GEMINI_OPENAI_BASE_URL, OpenAiCompatProvider};
pub use router::{ModelRouter, RetryPolicy};
pub use types::{
    ChatMessage, ChatResponse, ChatRole, ChatUsage, LlmProvider, ProviderStatusError, StopReason,
};

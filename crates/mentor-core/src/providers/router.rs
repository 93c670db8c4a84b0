//! Model router: retry with backoff on one provider, then fail over to the next

use anyhow::{Result, anyhow};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{ChatMessage, ChatResponse, LlmProvider, ProviderStatusError};

/// How many times one provider is tried, and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Delay after the given zero-based failed attempt, doubling each time
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Whether a failed call is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Transient,
    Permanent,
}

impl Failure {
    /// Quota, overload, 5xx and network trouble are transient; auth and
    /// request errors are not. A status reported by the provider decides on
    /// its own, so numbers inside an error body never count.
    fn of(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(status) = cause.downcast_ref::<ProviderStatusError>() {
                return if status.is_transient() {
                    Self::Transient
                } else {
                    Self::Permanent
                };
            }
            if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
                if http.is_timeout() || http.is_connect() {
                    return Self::Transient;
                }
            }
        }

        const TRANSIENT: &[&str] = &[
            "status 429",
            "status 500",
            "status 502",
            "status 503",
            "status 504",
            "rate limit",
            "rate_limit",
            "resource_exhausted",
            "overloaded",
            "timed out",
            "connection reset",
            "connection refused",
            "temporarily unavailable",
        ];
        let lower = format!("{:#}", err).to_lowercase();
        if TRANSIENT.iter().any(|p| lower.contains(p)) {
            Self::Transient
        } else {
            Self::Permanent
        }
    }
}

/// Sends each request to the primary provider, falling back in order
pub struct ModelRouter {
    /// Index 0 is the primary
    providers: Vec<Box<dyn LlmProvider>>,
    policy: RetryPolicy,
}

impl ModelRouter {
    /// One provider, one attempt
    pub fn single(provider: Box<dyn LlmProvider>) -> Self {
        Self {
            providers: vec![provider],
            policy: RetryPolicy::once(),
        }
    }

    /// Several providers in failover order
    pub fn with_failover(providers: Vec<Box<dyn LlmProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(anyhow!("ModelRouter needs at least one provider"));
        }
        Ok(Self {
            providers,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_max_retries(mut self, attempts: u32) -> Self {
        self.policy.attempts = attempts.max(1);
        self
    }

    pub fn with_base_retry_delay(mut self, delay: Duration) -> Self {
        self.policy.base_delay = delay;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn chat(&self, messages: &[ChatMessage], system: &str) -> Result<ChatResponse> {
        let mut last_error = None;

        for (idx, provider) in self.providers.iter().enumerate() {
            match self.try_provider(provider.as_ref(), messages, system).await {
                Ok(response) => {
                    if idx > 0 {
                        info!(
                            "Answered by fallback provider {} ({})",
                            provider.provider_name(),
                            provider.model()
                        );
                    }
                    return Ok(response);
                }
                Err(e) => last_error = Some(e),
            }

            if let Some(next) = self.providers.get(idx + 1) {
                info!(
                    "Provider {} exhausted, trying {}",
                    provider.provider_name(),
                    next.provider_name()
                );
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("No provider produced a response")))
    }

    /// Up to `policy.attempts` calls, stopping early on a permanent failure
    async fn try_provider(
        &self,
        provider: &dyn LlmProvider,
        messages: &[ChatMessage],
        system: &str,
    ) -> Result<ChatResponse> {
        let mut attempt = 0;
        loop {
            debug!(
                "{} ({}) attempt {}/{}",
                provider.provider_name(),
                provider.model(),
                attempt + 1,
                self.policy.attempts
            );

            let err = match provider.chat(messages, system).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let failure = Failure::of(&err);
            warn!(
                "{} ({}) failed on attempt {} ({:?}): {:#}",
                provider.provider_name(),
                provider.model(),
                attempt + 1,
                failure,
                err
            );

            attempt += 1;
            if failure == Failure::Permanent || attempt >= self.policy.attempts {
                return Err(err);
            }

            let delay = self.policy.backoff(attempt - 1);
            debug!("Retrying in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Model of the primary provider
    pub fn model(&self) -> &str {
        self.providers.first().map_or("unknown", |p| p.model())
    }

    /// Name of the primary provider
    pub fn provider_name(&self) -> &str {
        self.providers.first().map_or("unknown", |p| p.provider_name())
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

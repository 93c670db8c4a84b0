//! Error types for the routing core.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the registry, handoff coordinator and model invocation.
///
/// Startup errors (`Configuration`, `DuplicateName`, `NotFound`) are fatal to
/// the process. Per-turn errors (`InvalidTarget`, `Model`, `Timeout`) are
/// caught by the orchestrator and surfaced as a visible reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// Required configuration or credential is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An agent with this name is already registered
    #[error("Agent '{0}' is already registered")]
    DuplicateName(String),

    /// No agent with this name is registered
    #[error("Agent '{0}' not found")]
    NotFound(String),

    /// Handoff target is not part of the registry
    #[error("Cannot transfer to unknown agent '{0}'")]
    InvalidTarget(String),

    /// The language model call failed
    #[error("{0}")]
    Model(String),

    /// The language model call did not complete in time
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}

impl RoutingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    /// Check if this is a model invocation failure (including timeouts)
    pub fn is_model_failure(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, RoutingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            RoutingError::DuplicateName("Job Agent".to_string()).to_string(),
            "Agent 'Job Agent' is already registered"
        );
        assert_eq!(
            RoutingError::NotFound("Nobody".to_string()).to_string(),
            "Agent 'Nobody' not found"
        );
        assert_eq!(
            RoutingError::Timeout(Duration::from_secs(30)).to_string(),
            "Model call timed out after 30s"
        );
    }

    #[test]
    fn test_model_error_keeps_detail_verbatim() {
        let err = RoutingError::model("status 429: quota exceeded");
        assert_eq!(err.to_string(), "status 429: quota exceeded");
    }

    #[test]
    fn test_model_failure_includes_timeout() {
        assert!(RoutingError::Timeout(Duration::from_secs(1)).is_model_failure());
        assert!(!RoutingError::NotFound("x".to_string()).is_model_failure());
    }
}

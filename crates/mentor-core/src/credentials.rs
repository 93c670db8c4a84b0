//! Credential source for the model provider
//!
//! The API key must be present before any session is accepted; a missing
//! key is a fatal configuration error at startup.

use crate::error::{Result, RoutingError};

/// Environment variable the Gemini key is read from by default
pub const DEFAULT_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Supplies the API key used by model invocation
pub trait CredentialSource {
    /// Human-readable origin, used in error messages
    fn describe(&self) -> String;

    fn api_key(&self) -> Option<String>;
}

/// Reads the key from an environment variable
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_VAR)
    }
}

impl CredentialSource for EnvCredentials {
    fn describe(&self) -> String {
        format!("environment variable {}", self.var)
    }

    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// A key that was already resolved, e.g. from an expanded config file value
#[derive(Clone)]
pub struct StaticCredentials {
    origin: String,
    key: String,
}

impl StaticCredentials {
    pub fn new(origin: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("origin", &self.origin)
            .finish()
    }
}

impl CredentialSource for StaticCredentials {
    fn describe(&self) -> String {
        self.origin.clone()
    }

    fn api_key(&self) -> Option<String> {
        Some(self.key.clone())
    }
}

/// Resolve the API key or fail with a descriptive configuration error
pub fn require_api_key(source: &dyn CredentialSource) -> Result<String> {
    match source.api_key() {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(RoutingError::configuration(format!(
            "API key is not set. Please ensure {} is defined (for example in your .env file).",
            source.describe()
        ))),
    }
}

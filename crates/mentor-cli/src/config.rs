use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use mentor_core::providers::GEMINI_OPENAI_BASE_URL;
use mentor_core::{AgentProfile, AgentRegistry, OrchestratorConfig};

/// Built-in configuration, also written by `mentor init`
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub fallback_providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_provider_name() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "${GEMINI_API_KEY}".to_string()
}
fn default_base_url() -> String {
    GEMINI_OPENAI_BASE_URL.to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash-lite-preview-06-17".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_entry_agent")]
    pub entry_agent: String,
    /// 0 disables the timeout
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_thinking_text")]
    pub thinking_text: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_entry_agent() -> String {
    "Triage Agent".to_string()
}
fn default_model_timeout() -> u64 {
    120
}
fn default_thinking_text() -> String {
    OrchestratorConfig::default().thinking_text
}
fn default_greeting() -> String {
    OrchestratorConfig::default().greeting
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            entry_agent: default_entry_agent(),
            model_timeout_secs: default_model_timeout(),
            thinking_text: default_thinking_text(),
            greeting: default_greeting(),
        }
    }
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mentor")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl MentorConfig {
    /// Load from `custom_path`, or `~/.mentor/config.toml`, falling back to the
    /// built-in defaults when no file exists at the default location
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_file(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    info!(
                        "No config at {}, using built-in defaults",
                        path.display()
                    );
                    Self::parse(DEFAULT_CONFIG, "built-in defaults")
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        // Refuse group/other readable configs; they may contain secrets
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `mentor init` first.",
                path.display()
            )
        })?;

        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        let raw: Self = toml::from_str(content)
            .with_context(|| format!("Failed to parse config from {}", origin))?;
        if !raw.provider.api_key.is_empty() && !raw.provider.api_key.contains("${") {
            warn!(
                "API key is hardcoded in {}. For security, use environment variables: api_key = \"${{GEMINI_API_KEY}}\"",
                origin
            );
        }

        // Expand environment variables after the hardcoded-key check
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).with_context(|| format!("Failed to parse config from {}", origin))
    }

    /// Copy with every API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.provider.api_key = mask_secret(&copy.provider.api_key);
        for fallback in &mut copy.fallback_providers {
            fallback.api_key = mask_secret(&fallback.api_key);
        }
        copy
    }

    /// Agents from the file, or the built-in roster when none are configured
    pub fn agent_profiles(&self) -> Vec<AgentProfile> {
        if self.agents.is_empty() {
            default_roster()
        } else {
            self.agents.clone()
        }
    }

    pub fn build_registry(&self) -> mentor_core::error::Result<AgentRegistry> {
        AgentRegistry::from_profiles(self.agent_profiles(), &self.orchestrator.entry_agent)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let section = &self.orchestrator;
        OrchestratorConfig {
            model_timeout: (section.model_timeout_secs > 0)
                .then(|| Duration::from_secs(section.model_timeout_secs)),
            thinking_text: section.thinking_text.clone(),
            greeting: section.greeting.clone(),
            ..OrchestratorConfig::default()
        }
    }
}

/// Triage, career and job agents
pub fn default_roster() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("Triage Agent", "You are a triage agent"),
        AgentProfile::new(
            "Career Agent",
            "You are a career agent. You will suggest fields to the users.",
        )
        .with_triggers(["career", "suggest career", "find best career", "find career"]),
        AgentProfile::new(
            "Job Agent",
            "You are a job searching agent. You will find the best real world jobs for the users.",
        )
        .with_triggers([
            "job",
            "suggest job",
            "find the best real world job",
            "search job and show",
            "find the job",
            "linkedin job",
            "indeed job",
            "internet job",
        ]),
    ]
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "MENTOR_API_KEY",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

//! Agent profile: an agent's identity, instructions, capabilities and trigger phrases

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An agent profile defines a distinct persona with its own instructions
/// and tool set. Profiles are immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Phrases that route a conversation to this agent, in priority order
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            capabilities: BTreeSet::new(),
            triggers: Vec::new(),
        }
    }

    pub fn with_capability(mut self, tool: impl Into<String>) -> Self {
        self.capabilities.insert(tool.into());
        self
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers.extend(triggers.into_iter().map(Into::into));
        self
    }

    /// Check if a tool is part of this agent's capability set
    pub fn has_capability(&self, tool: &str) -> bool {
        self.capabilities.contains(tool)
    }

    /// Whether any message can route to this agent
    pub fn is_routable(&self) -> bool {
        self.triggers.iter().any(|t| !t.trim().is_empty())
    }
}

impl std::fmt::Display for AgentProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_profile_new() {
        let profile = AgentProfile::new("Career Agent", "You are a career agent.");
        assert_eq!(profile.name, "Career Agent");
        assert_eq!(profile.instructions, "You are a career agent.");
        assert!(profile.capabilities.is_empty());
        assert!(profile.triggers.is_empty());
    }

    #[test]
    fn test_capabilities_are_a_set() {
        let profile = AgentProfile::new("Job Agent", "")
            .with_capability("web_search")
            .with_capability("web_search")
            .with_capability("browse");
        assert_eq!(profile.capabilities.len(), 2);
        assert!(profile.has_capability("web_search"));
        assert!(!profile.has_capability("send_email"));
    }

    #[test]
    fn test_triggers_keep_order() {
        let profile = AgentProfile::new("Job Agent", "").with_triggers(["job", "suggest job"]);
        assert_eq!(profile.triggers, vec!["job", "suggest job"]);
        assert!(profile.is_routable());
    }

    #[test]
    fn test_blank_triggers_are_not_routable() {
        let profile = AgentProfile::new("Triage Agent", "").with_triggers(["  ", ""]);
        assert!(!profile.is_routable());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let profile: AgentProfile = serde_json::from_str(r#"{"name": "Triage Agent"}"#).unwrap();
        assert_eq!(profile.name, "Triage Agent");
        assert!(profile.instructions.is_empty());
        assert!(!profile.is_routable());
    }
}

//! Agent registry: the static roster of agents, built once at startup

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::profile::AgentProfile;
use crate::error::{Result, RoutingError};

/// Holds every agent a session may be routed to, in registration order.
///
/// The entry-point agent is always registered; new sessions start with it
/// active. The registry is read-only once shared with the orchestrator.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Arc<AgentProfile>>,
    index: HashMap<String, usize>,
    entry_agent: String,
}

impl AgentRegistry {
    /// Create a registry whose first agent is the entry point (triage)
    pub fn new(entry_profile: AgentProfile) -> Self {
        let entry_agent = entry_profile.name.clone();
        let mut index = HashMap::new();
        index.insert(entry_agent.clone(), 0);
        info!("AgentRegistry: initialized with entry agent '{}'", entry_agent);
        Self {
            agents: vec![Arc::new(entry_profile)],
            index,
            entry_agent,
        }
    }

    /// Build a registry from profiles in order, designating `entry_agent` as
    /// the entry point. Fails on duplicate names or a missing entry agent.
    pub fn from_profiles(profiles: Vec<AgentProfile>, entry_agent: &str) -> Result<Self> {
        let mut registry = Self {
            agents: Vec::with_capacity(profiles.len()),
            index: HashMap::new(),
            entry_agent: entry_agent.to_string(),
        };
        for profile in profiles {
            registry.register(profile)?;
        }
        if !registry.contains(entry_agent) {
            return Err(RoutingError::NotFound(entry_agent.to_string()));
        }
        info!(
            "AgentRegistry: built {} agents, entry agent '{}'",
            registry.len(),
            entry_agent
        );
        Ok(registry)
    }

    /// Register an agent. Names are unique within the registry.
    pub fn register(&mut self, profile: AgentProfile) -> Result<()> {
        if self.index.contains_key(&profile.name) {
            return Err(RoutingError::DuplicateName(profile.name));
        }
        debug!(
            "AgentRegistry: registered '{}' ({} triggers, {} capabilities)",
            profile.name,
            profile.triggers.len(),
            profile.capabilities.len()
        );
        self.index.insert(profile.name.clone(), self.agents.len());
        self.agents.push(Arc::new(profile));
        Ok(())
    }

    /// Look up an agent by name
    pub fn lookup(&self, name: &str) -> Result<Arc<AgentProfile>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.agents[i]))
            .ok_or_else(|| RoutingError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The agent every new session starts with
    pub fn entry_point(&self) -> Arc<AgentProfile> {
        Arc::clone(&self.agents[self.index[&self.entry_agent]])
    }

    pub fn entry_agent_name(&self) -> &str {
        &self.entry_agent
    }

    /// Agents in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AgentProfile>> {
        self.agents.iter()
    }

    /// Agent names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

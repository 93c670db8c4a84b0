//! Handoff coordination
//!
//! Executes a transfer of control: checks the target against the registry,
//! switches the session's active agent and returns the announcement as a
//! `system-notice` message. The coordinator never appends to history and
//! never calls the model; the orchestrator owns the single append point and
//! the transport send.

use std::sync::Arc;
use tracing::{error, info};

use crate::agents::{AgentProfile, AgentRegistry};
use crate::error::{Result, RoutingError};
use crate::session::Session;
use crate::types::Message;

pub struct HandoffCoordinator {
    registry: Arc<AgentRegistry>,
}

impl HandoffCoordinator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// Switch `session` to `target_agent` and return the announcement.
    ///
    /// On error the session is left untouched.
    pub fn execute(&self, session: &mut Session, target_agent: &str) -> Result<Message> {
        let target = self.registry.lookup(target_agent).map_err(|_| {
            error!(
                "Handoff target '{}' is not registered (session '{}')",
                target_agent, session.id
            );
            RoutingError::InvalidTarget(target_agent.to_string())
        })?;

        info!(
            "Session '{}': handing off '{}' → '{}'",
            session.id, session.active_agent, target.name
        );
        session.active_agent = target.name.clone();

        Ok(announcement(&target))
    }
}

/// The notice shown to the user when `agent` takes over
pub fn announcement(agent: &AgentProfile) -> Message {
    Message::system_notice(format!(
        "🔄 **Handing off to {name}...**\n\n\
         I'm transferring your request to our {lower} who will be able to better assist you.",
        name = agent.name,
        lower = agent.name.to_lowercase(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn registry() -> Arc<AgentRegistry> {
        let mut registry = AgentRegistry::new(AgentProfile::new("Triage Agent", "triage"));
        registry
            .register(AgentProfile::new("Career Agent", "careers").with_triggers(["career"]))
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_execute_switches_agent() {
        let coordinator = HandoffCoordinator::new(registry());
        let mut session = Session::new("s1", "Triage Agent");

        let notice = coordinator.execute(&mut session, "Career Agent").unwrap();

        assert_eq!(session.active_agent, "Career Agent");
        assert_eq!(notice.role, Role::SystemNotice);
        assert!(notice.content.contains("Career Agent"));
        assert!(notice.content.contains("career agent"));
    }

    #[test]
    fn test_execute_does_not_append_history() {
        let coordinator = HandoffCoordinator::new(registry());
        let mut session = Session::new("s1", "Triage Agent");
        session.append(Message::user("I need career advice"));

        coordinator.execute(&mut session, "Career Agent").unwrap();
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_execute_unknown_target() {
        let coordinator = HandoffCoordinator::new(registry());
        let mut session = Session::new("s1", "Triage Agent");

        let err = coordinator.execute(&mut session, "Travel Agent").unwrap_err();

        assert_eq!(err, RoutingError::InvalidTarget("Travel Agent".to_string()));
        assert_eq!(session.active_agent, "Triage Agent");
    }

    #[test]
    fn test_transfer_back_to_triage_permitted() {
        let coordinator = HandoffCoordinator::new(registry());
        let mut session = Session::new("s1", "Career Agent");
        coordinator.execute(&mut session, "Triage Agent").unwrap();
        assert_eq!(session.active_agent, "Triage Agent");
    }

    #[test]
    fn test_announcement_text() {
        let notice = announcement(&AgentProfile::new("Job Agent", ""));
        assert!(notice.content.starts_with("🔄 **Handing off to Job Agent...**"));
        assert!(notice.content.ends_with("our job agent who will be able to better assist you."));
    }
}

//! Shared types for mentor-core

use serde::{Deserialize, Serialize};

/// Who produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    SystemNotice,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
            Self::SystemNotice => write!(f, "system_notice"),
        }
    }
}

/// A role-tagged history entry. History never references an agent directly,
/// so switching the active agent leaves earlier entries valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }

    pub fn system_notice(content: impl Into<String>) -> Self {
        Self {
            role: Role::SystemNotice,
            content: content.into(),
        }
    }
}

/// Outcome of classifying one incoming message. Computed per turn, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub transfer: bool,
    pub target_agent: Option<String>,
}

impl RoutingDecision {
    /// The active agent keeps the conversation
    pub fn stay() -> Self {
        Self {
            transfer: false,
            target_agent: None,
        }
    }

    /// Control moves to the named agent
    pub fn transfer_to(agent: impl Into<String>) -> Self {
        Self {
            transfer: true,
            target_agent: Some(agent.into()),
        }
    }

    /// Target agent name when this is a transfer
    pub fn target(&self) -> Option<&str> {
        if self.transfer {
            self.target_agent.as_deref()
        } else {
            None
        }
    }
}

/// What kind of outgoing message this is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Normal response message
    #[default]
    Response,
    /// Interim "working" indicator, overwritten once the turn completes
    Placeholder,
}

/// Outgoing message handed to a chat transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub kind: MessageKind,
}

impl OutgoingMessage {
    pub fn new(content: impl Into<String>, author: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Agent.to_string(), "agent");
        assert_eq!(Role::SystemNotice.to_string(), "system_notice");
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::agent("hello").role, Role::Agent);
        let notice = Message::system_notice("moving on");
        assert_eq!(notice.role, Role::SystemNotice);
        assert_eq!(notice.content, "moving on");
    }

    #[test]
    fn test_routing_decision_target() {
        assert_eq!(RoutingDecision::stay().target(), None);
        let decision = RoutingDecision::transfer_to("Job Agent");
        assert!(decision.transfer);
        assert_eq!(decision.target(), Some("Job Agent"));
    }

    #[test]
    fn test_message_serializes_role_snake_case() {
        let json = serde_json::to_string(&Message::system_notice("x")).unwrap();
        assert!(json.contains("\"system_notice\""));
    }

    #[test]
    fn test_message_kind_default() {
        assert_eq!(MessageKind::default(), MessageKind::Response);
    }
}

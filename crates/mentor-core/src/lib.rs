//! mentor-core - routing and handoff core of the mentor assistant
//!
//! This crate provides:
//! - Agent registry with trigger phrases and capability sets
//! - Keyword intent classifier deciding stay vs. transfer per message
//! - Handoff coordinator that switches the active agent and announces it
//! - Per-conversation session store
//! - Conversation orchestrator tying these together around a model call
//! - OpenAI-compatible provider layer with failover, behind `ModelInvocation`

pub mod agents;
pub mod context;
pub mod credentials;
pub mod error;
pub mod handoff;
pub mod intent;
pub mod invocation;
pub mod orchestrator;
pub mod providers;
pub mod session;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use agents::{AgentProfile, AgentRegistry};
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials, require_api_key};
pub use error::RoutingError;
pub use handoff::HandoffCoordinator;
pub use intent::IntentClassifier;
pub use invocation::{ModelInvocation, ProviderInvocation};
pub use orchestrator::{Orchestrator, OrchestratorConfig, TurnOutcome, TurnReply};
pub use session::{Session, SessionStore};
pub use transport::{ChatTransport, MessageHandle};
pub use types::{Message, MessageKind, OutgoingMessage, Role, RoutingDecision};

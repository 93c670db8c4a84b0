//! Chat transport seam
//!
//! Transports deliver turn output to the user. Sending returns a handle so a
//! message can be overwritten later; this is how the "thinking" placeholder
//! is replaced by the real reply once the model call resolves.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::OutgoingMessage;

/// Refers to a message already delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub String);

impl MessageHandle {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for MessageHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait that chat front-ends implement
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a message and return a handle to it
    async fn send(&self, msg: OutgoingMessage) -> Result<MessageHandle>;

    /// Replace the content of a previously sent message
    async fn update(&self, handle: &MessageHandle, content: &str) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingTransport, TransportEvent};
    use super::*;
    use crate::types::MessageKind;

    #[test]
    fn test_handles_are_unique() {
        assert_ne!(MessageHandle::new(), MessageHandle::new());
    }

    #[tokio::test]
    async fn test_send_then_update_same_handle() {
        let transport = RecordingTransport::default();
        let handle = transport
            .send(OutgoingMessage::new("Thinking...", "mentor", MessageKind::Placeholder))
            .await
            .unwrap();
        transport.update(&handle, "done").await.unwrap();

        let events = transport.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], TransportEvent::Sent(h, _) if *h == handle));
        assert_eq!(events[1], TransportEvent::Updated(handle, "done".to_string()));
    }
}

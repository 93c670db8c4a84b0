//! Terminal chat transport
//!
//! A placeholder is printed without a trailing newline so the reply can
//! overwrite it in place once the turn completes.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;

use mentor_core::{ChatTransport, MessageHandle, MessageKind, OutgoingMessage};

/// Clears the current terminal line
const CLEAR_LINE: &str = "\r\x1b[2K";

pub struct ConsoleTransport<W: Write + Send> {
    out: Mutex<W>,
    /// Placeholder still on screen and its author
    pending: Mutex<Option<(MessageHandle, String)>>,
}

impl ConsoleTransport<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            pending: Mutex::new(None),
        }
    }

    /// Consume the transport and return its writer
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, text: &str) -> Result<()> {
        let mut out = self.out.lock().map_err(|_| anyhow!("console writer poisoned"))?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> ChatTransport for ConsoleTransport<W> {
    async fn send(&self, msg: OutgoingMessage) -> Result<MessageHandle> {
        let handle = MessageHandle::new();
        match msg.kind {
            MessageKind::Placeholder => {
                self.write(&format!("{}: {}", msg.author, msg.content))?;
                *self.pending.lock().map_err(|_| anyhow!("console state poisoned"))? =
                    Some((handle.clone(), msg.author));
            }
            MessageKind::Response => {
                self.write(&format!("{}: {}\n", msg.author, msg.content))?;
            }
        }
        Ok(handle)
    }

    async fn update(&self, handle: &MessageHandle, content: &str) -> Result<()> {
        let pending = {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| anyhow!("console state poisoned"))?;
            let matches = pending.as_ref().is_some_and(|(current, _)| current == handle);
            if matches { pending.take() } else { None }
        };

        match pending {
            Some((_, author)) => self.write(&format!("{}{}: {}\n", CLEAR_LINE, author, content)),
            // Earlier lines can't be rewritten in a terminal, print a fresh one
            None => self.write(&format!("{}\n", content)),
        }
    }
}

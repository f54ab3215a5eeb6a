//! Per-agent FIFO inbox.

use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

use super::Message;
use crate::types::AgentId;

/// Receiving end of an agent's queue. The sending end lives in the bus routing table.
#[derive(Debug)]
pub struct Mailbox {
    owner: AgentId,
    rx: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl Mailbox {
    pub(super) fn new(owner: AgentId, rx: mpsc::UnboundedReceiver<Message>) -> Self {
        Self {
            owner,
            rx: Mutex::new(rx),
        }
    }

    pub fn owner(&self) -> &AgentId {
        &self.owner
    }

    /// Wait up to `wait` for the oldest queued message.
    ///
    /// `None` is the idle outcome, not an error. Once the mailbox has been
    /// unregistered the call still waits out the full bound, so a looping
    /// caller never spins.
    pub async fn receive(&self, wait: Duration) -> Option<Message> {
        let mut rx = self.rx.lock().await;
        match timeout(wait, rx.recv()).await {
            Ok(Some(msg)) => Some(msg),
            Ok(None) => {
                drop(rx);
                tokio::time::sleep(wait).await;
                None
            }
            Err(_elapsed) => None,
        }
    }

    /// Take the oldest queued message without waiting.
    pub async fn try_receive(&self) -> Option<Message> {
        self.rx.lock().await.try_recv().ok()
    }
}

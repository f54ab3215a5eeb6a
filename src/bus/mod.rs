//! Message bus for addressed agent-to-agent delivery.
//!
//! The bus is the one piece of state shared by every agent: a routing table
//! from agent id to that agent's queue. Each mailbox is its own unbounded
//! channel, so a send holds the table's read lock only long enough to push one
//! message; unrelated mailboxes never contend.
//!
//! Guarantees:
//!   - **Addressed**: every message has exactly one recipient
//!   - **Fire-and-forget**: `send` returns as soon as the message is queued
//!   - **FIFO per sender**: one sender's messages to one recipient arrive in send order
//!   - **Loud failure**: an unknown recipient is `RecipientNotFound`, never a silent drop

mod mailbox;
mod message;

pub use mailbox::Mailbox;
pub use message::{meta, Message, MessageKind, Performative};

use crate::types::{AgentId, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

// =============================================================================
// MessageBus - In-Memory Routing Table
// =============================================================================

/// In-memory message bus. Clones share the same routing table.
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// Routing table: agent id -> mailbox sender
    mailboxes: Arc<RwLock<HashMap<AgentId, mpsc::UnboundedSender<Message>>>>,

    /// Statistics
    stats: Arc<RwLock<BusStats>>,
}

/// Statistics about bus usage.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    pub messages_delivered: u64,
    pub undeliverable: u64,
    pub registered_mailboxes: usize,
}

impl MessageBus {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self {
            mailboxes: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(BusStats::default())),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a mailbox for `id`.
    ///
    /// Fails with `AlreadyRegistered` while another live mailbox holds the id.
    /// An entry whose mailbox was dropped without unregistering is replaced.
    pub async fn register(&self, id: AgentId) -> Result<Mailbox> {
        let mut mailboxes = self.mailboxes.write().await;

        if let Some(existing) = mailboxes.get(&id) {
            if !existing.is_closed() {
                return Err(Error::AlreadyRegistered(id));
            }
            tracing::debug!(agent = %id, "Replacing stale mailbox");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        mailboxes.insert(id.clone(), tx);
        let registered = mailboxes.len();
        drop(mailboxes);

        self.stats.write().await.registered_mailboxes = registered;
        tracing::debug!(agent = %id, "Registered mailbox");

        Ok(Mailbox::new(id, rx))
    }

    /// Remove `id` from the routing table. Unknown ids are ignored.
    pub async fn unregister(&self, id: &AgentId) {
        let mut mailboxes = self.mailboxes.write().await;
        let removed = mailboxes.remove(id).is_some();
        let registered = mailboxes.len();
        drop(mailboxes);

        self.stats.write().await.registered_mailboxes = registered;
        if removed {
            tracing::debug!(agent = %id, "Unregistered mailbox");
        }
    }

    pub async fn is_registered(&self, id: &AgentId) -> bool {
        self.mailboxes
            .read()
            .await
            .get(id)
            .is_some_and(|tx| !tx.is_closed())
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Queue `msg` on its recipient's mailbox.
    pub async fn send(&self, msg: Message) -> Result<()> {
        let delivered = {
            let mailboxes = self.mailboxes.read().await;
            match mailboxes.get(&msg.to) {
                Some(tx) => tx.send(msg).map_err(|rejected| rejected.0),
                None => Err(msg),
            }
        };

        let mut stats = self.stats.write().await;
        match delivered {
            Ok(()) => {
                stats.messages_delivered += 1;
                Ok(())
            }
            Err(msg) => {
                stats.undeliverable += 1;
                tracing::debug!(from = %msg.from, to = %msg.to, "Undeliverable message");
                Err(Error::RecipientNotFound(msg.to))
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get current bus statistics.
    pub async fn stats(&self) -> BusStats {
        self.stats.read().await.clone()
    }

    /// Reset delivery counters.
    pub async fn reset_stats(&self) {
        let mut stats = self.stats.write().await;
        stats.messages_delivered = 0;
        stats.undeliverable = 0;
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

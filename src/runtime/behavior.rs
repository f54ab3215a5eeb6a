//! Behaviors and the context they run against.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::bus::{Mailbox, Message, MessageBus};
use crate::types::{AgentId, Error, Result};

/// How the runtime schedules a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorKind {
    /// `step` runs once.
    OneShot,
    /// `step` runs in a loop until it returns [`Flow::Done`] or the agent stops.
    Cyclic,
}

/// What a behavior wants after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

/// A unit of agent work.
///
/// Steps may only suspend on [`AgentContext::receive`], [`AgentContext::pause`]
/// or bus sends; the runtime drops a step at its next suspension point once
/// the agent is stopped.
#[async_trait]
pub trait Behavior: Send + 'static {
    fn name(&self) -> &'static str;

    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Cyclic
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow>;
}

/// Handle given to every behavior of one agent.
#[derive(Debug, Clone)]
pub struct AgentContext {
    id: AgentId,
    bus: MessageBus,
    mailbox: Arc<Mailbox>,
    cancel: CancellationToken,
}

impl AgentContext {
    pub(super) fn new(
        id: AgentId,
        bus: MessageBus,
        mailbox: Arc<Mailbox>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            bus,
            mailbox,
            cancel,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Send through the bus. Refused once the agent has been stopped.
    pub async fn send(&self, msg: Message) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Stopped(self.id.clone()));
        }
        tracing::trace!(from = %msg.from, to = %msg.to, kind = ?msg.kind(), "send");
        self.bus.send(msg).await
    }

    /// Oldest message in this agent's mailbox, or `None` after `wait`.
    pub async fn receive(&self, wait: Duration) -> Option<Message> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            msg = self.mailbox.receive(wait) => msg,
        }
    }

    /// Simulated work. Returns early if the agent is stopped.
    pub async fn pause(&self, duration: Duration) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(super) async fn stopped(&self) {
        self.cancel.cancelled().await
    }
}

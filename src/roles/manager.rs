//! Manager role - watches departures and dispatches cleaning.

use async_trait::async_trait;
use std::time::Duration;

use crate::bus::{meta, Message, MessageKind};
use crate::runtime::{AgentContext, Behavior, Flow};
use crate::types::{AgentId, Config, Result};

/// Cyclic behavior of the manager agent.
#[derive(Debug)]
pub struct Supervise {
    cleaning: AgentId,
    receive_timeout: Duration,
}

impl Supervise {
    pub fn new(config: &Config) -> Self {
        Self {
            cleaning: config.directory.cleaning.clone(),
            receive_timeout: config.receive.staff_timeout,
        }
    }
}

#[async_trait]
impl Behavior for Supervise {
    fn name(&self) -> &'static str {
        "supervise"
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        let Some(msg) = ctx.receive(self.receive_timeout).await else {
            tracing::trace!("Restaurant quiet");
            return Ok(Flow::Continue);
        };

        match msg.kind() {
            Some(MessageKind::Departed) => {
                tracing::info!(departure = %msg.body, "Customer departed");
                let mut request = Message::new(
                    ctx.id().clone(),
                    self.cleaning.clone(),
                    MessageKind::CleanupRequested,
                )
                .with_body(format!("Clean table after {}", msg.body));
                if let Some(num) = msg.meta(meta::CUSTOMER_NUM) {
                    request = request.with_meta(meta::CUSTOMER_NUM, num);
                }
                ctx.send(request).await?;
            }
            other => tracing::debug!(kind = ?other, from = %msg.from, "Manager ignores message"),
        }
        Ok(Flow::Continue)
    }
}

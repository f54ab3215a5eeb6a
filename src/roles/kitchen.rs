//! Kitchen role - prepares each order and hands the meal to serving.

use async_trait::async_trait;
use std::time::Duration;

use crate::bus::{meta, Message, MessageKind};
use crate::runtime::{AgentContext, Behavior, Flow};
use crate::types::{AgentId, Config, Result};

/// Cyclic behavior of the kitchen agent. Orders are cooked one at a time.
#[derive(Debug)]
pub struct PrepareMeals {
    serving: AgentId,
    preparation: Duration,
    receive_timeout: Duration,
}

impl PrepareMeals {
    pub fn new(config: &Config) -> Self {
        Self {
            serving: config.directory.serving.clone(),
            preparation: config.timings.kitchen_preparation,
            receive_timeout: config.receive.staff_timeout,
        }
    }

    async fn cook(&self, ctx: &AgentContext, ticket: Message) -> Result<()> {
        tracing::info!(order = %ticket.body, "Preparing order");
        ctx.pause(self.preparation).await;

        let mut meal = Message::new(ctx.id().clone(), self.serving.clone(), MessageKind::MealReady)
            .with_body(ticket.body.clone());
        for key in [meta::CUSTOMER_JID, meta::CUSTOMER_NUM] {
            if let Some(value) = ticket.meta(key) {
                meal = meal.with_meta(key, value);
            }
        }
        ctx.send(meal).await?;

        tracing::info!(order = %ticket.body, "Meal ready; notified serving");
        Ok(())
    }
}

#[async_trait]
impl Behavior for PrepareMeals {
    fn name(&self) -> &'static str {
        "prepare_meals"
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        let Some(msg) = ctx.receive(self.receive_timeout).await else {
            return Ok(Flow::Continue);
        };

        match msg.kind() {
            Some(MessageKind::OrderPlaced) => self.cook(ctx, msg).await?,
            other => tracing::debug!(kind = ?other, from = %msg.from, "Kitchen ignores message"),
        }
        Ok(Flow::Continue)
    }
}

//! Order-taking role - relays customer orders to the kitchen.

use async_trait::async_trait;
use std::time::Duration;

use crate::bus::{meta, Message, MessageKind};
use crate::runtime::{AgentContext, Behavior, Flow};
use crate::types::{AgentId, Config, Result};

/// Cyclic behavior of the order agent.
#[derive(Debug)]
pub struct TakeOrders {
    kitchen: AgentId,
    receive_timeout: Duration,
}

impl TakeOrders {
    pub fn new(config: &Config) -> Self {
        Self {
            kitchen: config.directory.kitchen.clone(),
            receive_timeout: config.receive.staff_timeout,
        }
    }

    /// Kitchen ticket for an order. The customer address falls back to the sender.
    fn ticket(&self, from: &AgentId, order: &Message) -> Message {
        let customer_jid = order
            .customer_jid()
            .unwrap_or_else(|| order.from.clone());
        let customer_num = order.meta(meta::CUSTOMER_NUM).unwrap_or("unknown");

        Message::new(from.clone(), self.kitchen.clone(), MessageKind::OrderPlaced)
            .with_meta(meta::CUSTOMER_JID, &customer_jid)
            .with_meta(meta::CUSTOMER_NUM, customer_num)
            .with_body(order.body.clone())
    }
}

#[async_trait]
impl Behavior for TakeOrders {
    fn name(&self) -> &'static str {
        "take_orders"
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        let Some(msg) = ctx.receive(self.receive_timeout).await else {
            tracing::trace!("No orders");
            return Ok(Flow::Continue);
        };

        match msg.kind() {
            Some(MessageKind::OrderPlaced) => {
                tracing::info!(customer = %msg.from, order = %msg.body, "Received order");
                ctx.send(self.ticket(ctx.id(), &msg)).await?;
                tracing::info!(order = %msg.body, "Order forwarded to kitchen");
            }
            other => tracing::debug!(kind = ?other, from = %msg.from, "Order desk ignores message"),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MessageBus;
    use crate::runtime::AgentRuntime;

    #[test]
    fn test_ticket_prefers_existing_customer_address() {
        let config = Config::default();
        let desk = TakeOrders::new(&config);
        let order = Message::new(
            AgentId::must("front_door"),
            config.directory.order.clone(),
            MessageKind::OrderPlaced,
        )
        .with_meta(meta::CUSTOMER_JID, AgentId::customer(7))
        .with_meta(meta::CUSTOMER_NUM, 7)
        .with_body("Pizza and soda");

        let ticket = desk.ticket(&config.directory.order, &order);
        assert_eq!(ticket.to, config.directory.kitchen);
        assert_eq!(ticket.customer_jid(), Some(AgentId::customer(7)));
        assert_eq!(ticket.customer_num(), Some(7));
    }

    #[test]
    fn test_ticket_without_number_is_unknown() {
        let config = Config::default();
        let desk = TakeOrders::new(&config);
        let order = Message::new(
            AgentId::customer(2),
            config.directory.order.clone(),
            MessageKind::OrderPlaced,
        )
        .with_body("Salad and water");

        let ticket = desk.ticket(&config.directory.order, &order);
        assert_eq!(ticket.customer_jid(), Some(AgentId::customer(2)));
        assert_eq!(ticket.meta(meta::CUSTOMER_NUM), Some("unknown"));
        assert_eq!(ticket.customer_num(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_reaches_kitchen_unchanged() {
        let config = Config::default();
        let bus = MessageBus::new();
        let kitchen = bus.register(config.directory.kitchen.clone()).await.unwrap();

        let mut agent = AgentRuntime::new(config.directory.order.clone(), bus.clone());
        agent.add_behavior(TakeOrders::new(&config)).unwrap();
        agent.start().await.unwrap();

        let customer = AgentId::customer(1);
        bus.send(
            Message::new(customer.clone(), config.directory.order.clone(), MessageKind::OrderPlaced)
                .with_meta(meta::CUSTOMER_NUM, 1)
                .with_body("Steak and wine"),
        )
        .await
        .unwrap();

        let ticket = kitchen.receive(Duration::from_secs(5)).await.unwrap();
        assert_eq!(ticket.kind(), Some(MessageKind::OrderPlaced));
        assert_eq!(ticket.from, config.directory.order);
        assert_eq!(ticket.body, "Steak and wine");
        assert_eq!(ticket.customer_jid(), Some(customer));
        assert_eq!(ticket.customer_num(), Some(1));

        agent.stop().await;
    }
}

//! Billing role - prices served meals and bills the customer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::bus::{meta, Message, MessageKind};
use crate::menu::{Menu, Money};
use crate::runtime::{AgentContext, Behavior, Flow};
use crate::types::{AgentId, Config, Error, Result};

/// An itemised bill for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub item: String,
    pub subtotal: Money,
    pub tax_rate_bp: u32,
    pub tax: Money,
    pub total: Money,
    pub server_id: Option<u8>,
}

impl Bill {
    pub fn compute(
        item: impl Into<String>,
        subtotal: Money,
        tax_rate_bp: u32,
        server_id: Option<u8>,
    ) -> Self {
        let tax = subtotal.apply_rate_bp(tax_rate_bp);
        Self {
            item: item.into(),
            subtotal,
            tax_rate_bp,
            tax,
            total: subtotal + tax,
            server_id,
        }
    }

    /// Printable receipt, used as the message body.
    pub fn render(&self) -> String {
        let server = self
            .server_id
            .map_or_else(|| "unknown".to_string(), |id| id.to_string());
        format!(
            "bill: {}\nSubtotal: ${}\nTax: ${}\nTotal: ${}\nServer: #{}",
            self.item, self.subtotal, self.tax, self.total, server
        )
    }

    /// `billIssued` message carrying every field in metadata.
    pub fn to_message(&self, from: AgentId, to: AgentId) -> Message {
        let mut msg = Message::new(from, to, MessageKind::BillIssued)
            .with_meta(meta::ITEM, &self.item)
            .with_meta(meta::SUBTOTAL, self.subtotal)
            .with_meta(meta::TAX_RATE_BP, self.tax_rate_bp)
            .with_meta(meta::TAX, self.tax)
            .with_meta(meta::TOTAL, self.total)
            .with_body(self.render());
        if let Some(id) = self.server_id {
            msg = msg.with_meta(meta::SERVER_ID, id);
        }
        msg
    }

    /// Recover a bill from a `billIssued` message.
    pub fn from_message(msg: &Message) -> Result<Self> {
        if msg.kind() != Some(MessageKind::BillIssued) {
            return Err(Error::validation(format!(
                "expected billIssued, got {:?}",
                msg.kind()
            )));
        }
        fn field<'m>(msg: &'m Message, key: &str) -> Result<&'m str> {
            msg.meta(key)
                .ok_or_else(|| Error::validation(format!("bill is missing {key}")))
        }

        Ok(Self {
            item: field(msg, meta::ITEM)?.to_string(),
            subtotal: field(msg, meta::SUBTOTAL)?.parse()?,
            tax_rate_bp: field(msg, meta::TAX_RATE_BP)?
                .parse()
                .map_err(|_| Error::validation("bill has a malformed tax rate"))?,
            tax: field(msg, meta::TAX)?.parse()?,
            total: field(msg, meta::TOTAL)?.parse()?,
            server_id: msg.meta(meta::SERVER_ID).and_then(|id| id.parse().ok()),
        })
    }
}

/// Cyclic behavior of the billing agent.
#[derive(Debug)]
pub struct SettleBills {
    menu: Menu,
    tax_rate_bp: u32,
    computing: Duration,
    receive_timeout: Duration,
}

impl SettleBills {
    pub fn new(config: &Config) -> Self {
        Self {
            menu: Menu::new(config.menu.clone()),
            tax_rate_bp: config.billing.tax_rate_bp,
            computing: config.timings.billing,
            receive_timeout: config.receive.staff_timeout,
        }
    }

    /// Unknown dishes are billed at zero so the customer can still leave.
    fn price(&self, item: &str) -> Money {
        match self.menu.price(item) {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(error = %e, "Billing zero for unrecognised order");
                Money::ZERO
            }
        }
    }

    async fn issue(&self, ctx: &AgentContext, request: Message) -> Result<()> {
        tracing::info!(order = %request.body, "Processing payment request");
        ctx.pause(self.computing).await;

        let server_id = request.meta(meta::SERVER_ID).and_then(|id| id.parse().ok());
        let bill = Bill::compute(
            request.body.clone(),
            self.price(&request.body),
            self.tax_rate_bp,
            server_id,
        );

        let Some(customer) = request.customer_jid() else {
            tracing::debug!(order = %bill.item, "No customer address; dropping bill");
            return Ok(());
        };

        match ctx.send(bill.to_message(ctx.id().clone(), customer.clone())).await {
            Ok(()) => {
                tracing::info!(customer = %customer, total = %bill.total, "Bill sent to customer");
                Ok(())
            }
            Err(e) if e.is_recipient_not_found() => {
                tracing::warn!(customer = %customer, "Customer already gone; bill not delivered");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Behavior for SettleBills {
    fn name(&self) -> &'static str {
        "settle_bills"
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        let Some(msg) = ctx.receive(self.receive_timeout).await else {
            return Ok(Flow::Continue);
        };

        match msg.kind() {
            Some(MessageKind::PaymentDue) => self.issue(ctx, msg).await?,
            Some(MessageKind::PaymentConfirmed) => {
                tracing::info!(customer = %msg.from, "Payment received");
            }
            other => tracing::debug!(kind = ?other, from = %msg.from, "Billing ignores message"),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MessageBus;
    use crate::runtime::AgentRuntime;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    #[test]
    fn test_salad_and_water_bill() {
        let bill = Bill::compute("Salad and water", Money::from_cents(1599), 800, Some(2));
        assert_eq!(bill.tax, Money::from_cents(128));
        assert_eq!(bill.total, Money::from_cents(1727));
        assert_eq!(
            bill.render(),
            "bill: Salad and water\nSubtotal: $15.99\nTax: $1.28\nTotal: $17.27\nServer: #2"
        );
    }

    #[test]
    fn test_steak_and_wine_bill() {
        let bill = Bill::compute("Steak and wine", Money::from_cents(4599), 800, None);
        assert_eq!(bill.total.to_string(), "49.67");
        assert!(bill.render().ends_with("Server: #unknown"));
    }

    #[test]
    fn test_bill_survives_message_metadata() {
        let bill = Bill::compute("Fish and chips", Money::from_cents(2299), 800, Some(3));
        let msg = bill.to_message(AgentId::must("billing"), AgentId::customer(1));
        assert_eq!(Bill::from_message(&msg).unwrap(), bill);

        let mut broken = msg.clone();
        broken.metadata.remove(meta::TOTAL);
        assert!(Bill::from_message(&broken).is_err());

        let wrong_kind = Message::new(AgentId::must("a"), AgentId::must("b"), MessageKind::Departed);
        assert!(Bill::from_message(&wrong_kind).is_err());
    }

    proptest! {
        #[test]
        fn prop_total_is_price_times_rate_rounded(cents in 0u64..10_000_000) {
            let bill = Bill::compute("x", Money::from_cents(cents), 800, None);
            // round(cents * 1.08) in integer arithmetic, half-up
            let expected = (cents * 108 + 50) / 100;
            prop_assert_eq!(bill.total.cents(), expected);
            prop_assert_eq!(bill.total, bill.subtotal + bill.tax);
        }
    }

    fn payment_due(customer: &AgentId, item: &str) -> Message {
        Message::new(AgentId::must("serving"), AgentId::must("billing"), MessageKind::PaymentDue)
            .with_meta(meta::CUSTOMER_JID, customer)
            .with_meta(meta::SERVER_ID, 1)
            .with_body(item)
    }

    async fn billing_agent(bus: &MessageBus, config: &Config) -> AgentRuntime {
        let mut agent = AgentRuntime::new(AgentId::must("billing"), bus.clone());
        agent.add_behavior(SettleBills::new(config)).unwrap();
        agent.start().await.unwrap();
        agent
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_menu_item_billed_at_eight_percent() {
        let config = Config::default();
        let bus = MessageBus::new();
        let customer = AgentId::customer(1);
        let inbox = bus.register(customer.clone()).await.unwrap();
        let mut agent = billing_agent(&bus, &config).await;

        for item in &config.menu {
            bus.send(payment_due(&customer, &item.name)).await.unwrap();
            let msg = inbox.receive(Duration::from_secs(30)).await.unwrap();
            let bill = Bill::from_message(&msg).unwrap();

            assert_eq!(bill.item, item.name);
            assert_eq!(bill.subtotal, item.price);
            assert_eq!(bill.total.cents(), (item.price.cents() * 108 + 50) / 100);
            assert_eq!(bill.server_id, Some(1));
        }

        agent.stop().await;
    }

    #[test]
    #[traced_test]
    fn test_unknown_item_priced_zero_with_warning() {
        let billing = SettleBills::new(&Config::default());
        assert_eq!(billing.price("Burger and fries"), Money::from_cents(1899));
        assert_eq!(billing.price("Lobster thermidor"), Money::ZERO);
        assert!(logs_contain("Billing zero for unrecognised order"));
        assert!(logs_contain("Lobster thermidor"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_item_billed_zero() {
        let config = Config::default();
        let bus = MessageBus::new();
        let customer = AgentId::customer(9);
        let inbox = bus.register(customer.clone()).await.unwrap();
        let mut agent = billing_agent(&bus, &config).await;

        bus.send(payment_due(&customer, "Lobster thermidor")).await.unwrap();
        let bill = Bill::from_message(&inbox.receive(Duration::from_secs(30)).await.unwrap()).unwrap();

        assert_eq!(bill.item, "Lobster thermidor");
        assert_eq!(bill.subtotal, Money::ZERO);
        assert_eq!(bill.total, Money::ZERO);

        agent.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_departed_customer_does_not_stall_billing() {
        let config = Config::default();
        let bus = MessageBus::new();
        let gone = AgentId::customer(1);
        let present = AgentId::customer(2);
        let inbox = bus.register(present.clone()).await.unwrap();
        let mut agent = billing_agent(&bus, &config).await;

        bus.send(payment_due(&gone, "Pizza and soda")).await.unwrap();
        bus.send(payment_due(&present, "Pasta and wine")).await.unwrap();

        let bill = Bill::from_message(&inbox.receive(Duration::from_secs(30)).await.unwrap()).unwrap();
        assert_eq!(bill.item, "Pasta and wine");
        assert_eq!(bus.stats().await.undeliverable, 1);

        agent.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_without_customer_is_dropped() {
        let config = Config::default();
        let bus = MessageBus::new();
        let mut agent = billing_agent(&bus, &config).await;

        let anonymous =
            Message::new(AgentId::must("serving"), AgentId::must("billing"), MessageKind::PaymentDue)
                .with_body("Pizza and soda");
        bus.send(anonymous).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let stats = bus.stats().await;
        assert_eq!(stats.messages_delivered, 1);
        assert_eq!(stats.undeliverable, 0);

        agent.stop().await;
    }
}

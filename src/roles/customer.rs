//! Customer role - orders one meal, pays the bill, leaves.
//!
//! A customer agent lives for one session. It carries two behaviors: a
//! one-shot that places the order and a cyclic one that waits for the bill.
//! Its state is published on a `watch` channel so the session can report
//! where an abandoned customer got stuck.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::billing::Bill;
use crate::bus::{meta, Message, MessageBus, MessageKind};
use crate::runtime::{AgentContext, AgentRuntime, AgentState, Behavior, BehaviorKind, Flow};
use crate::session::CompletionSignal;
use crate::types::{AgentId, Config, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerState {
    Ordering,
    AwaitingBill,
    Paying,
    Departed,
}

impl fmt::Display for CustomerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CustomerState::Ordering => "ordering",
            CustomerState::AwaitingBill => "awaitingBill",
            CustomerState::Paying => "paying",
            CustomerState::Departed => "departed",
        };
        f.write_str(s)
    }
}

/// One-shot: settle in, then place the order.
#[derive(Debug)]
struct SendOrder {
    customer_num: u32,
    item: String,
    order_desk: AgentId,
    settle: Duration,
    state: Arc<watch::Sender<CustomerState>>,
}

#[async_trait]
impl Behavior for SendOrder {
    fn name(&self) -> &'static str {
        "send_order"
    }

    fn kind(&self) -> BehaviorKind {
        BehaviorKind::OneShot
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        ctx.pause(self.settle).await;

        let order = Message::new(ctx.id().clone(), self.order_desk.clone(), MessageKind::OrderPlaced)
            .with_meta(meta::CUSTOMER_NUM, self.customer_num)
            .with_body(self.item.clone());
        ctx.send(order).await?;

        self.state.send_replace(CustomerState::AwaitingBill);
        tracing::info!(customer_num = self.customer_num, order = %self.item, "Order placed");
        Ok(Flow::Done)
    }
}

/// Cyclic: wait for the bill, pay, announce departure, fire completion.
#[derive(Debug)]
struct HandleBill {
    customer_num: u32,
    billing: AgentId,
    manager: AgentId,
    payment: Duration,
    receive_timeout: Duration,
    state: Arc<watch::Sender<CustomerState>>,
    completion: Option<CompletionSignal<Bill>>,
}

impl HandleBill {
    async fn settle(&mut self, ctx: &AgentContext, bill: Bill) -> Result<()> {
        self.state.send_replace(CustomerState::Paying);
        ctx.pause(self.payment).await;

        let payment = Message::new(ctx.id().clone(), self.billing.clone(), MessageKind::PaymentConfirmed)
            .with_meta(meta::CUSTOMER_NUM, self.customer_num)
            .with_meta(meta::TOTAL, bill.total)
            .with_body(format!("Payment for {}: ${}", bill.item, bill.total));
        ctx.send(payment).await?;
        tracing::info!(customer_num = self.customer_num, total = %bill.total, "Payment sent");

        let departure = Message::new(ctx.id().clone(), self.manager.clone(), MessageKind::Departed)
            .with_meta(meta::CUSTOMER_NUM, self.customer_num)
            .with_body(format!("Customer {} leaving table", self.customer_num));
        // Payment already went out; a lost departure notice must not reopen the bill.
        match ctx.send(departure).await {
            Ok(()) => {}
            Err(e @ Error::Stopped(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(customer_num = self.customer_num, error = %e, "Departure notice undelivered");
            }
        }

        self.state.send_replace(CustomerState::Departed);
        if let Some(signal) = self.completion.take() {
            signal.fire(bill);
        }
        Ok(())
    }
}

#[async_trait]
impl Behavior for HandleBill {
    fn name(&self) -> &'static str {
        "handle_bill"
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        let Some(msg) = ctx.receive(self.receive_timeout).await else {
            tracing::trace!(customer_num = self.customer_num, "Still waiting for the bill");
            return Ok(Flow::Continue);
        };

        if msg.kind() != Some(MessageKind::BillIssued) {
            tracing::debug!(kind = ?msg.kind(), from = %msg.from, "Customer ignores message");
            return Ok(Flow::Continue);
        }

        let bill = match Bill::from_message(&msg) {
            Ok(bill) => bill,
            Err(e) => {
                tracing::warn!(customer_num = self.customer_num, error = %e, "Unreadable bill");
                return Ok(Flow::Continue);
            }
        };
        tracing::info!(customer_num = self.customer_num, bill = %msg.body, "Received bill");

        self.settle(ctx, bill).await?;
        Ok(Flow::Done)
    }
}

/// A customer agent for one session.
#[derive(Debug)]
pub struct Customer {
    customer_num: u32,
    runtime: AgentRuntime,
    order_desk: AgentId,
    settle: Duration,
    state_tx: Arc<watch::Sender<CustomerState>>,
    state: watch::Receiver<CustomerState>,
}

impl Customer {
    /// Build customer `customer_num`. `completion` fires with the paid bill.
    pub fn new(
        customer_num: u32,
        bus: MessageBus,
        config: &Config,
        completion: CompletionSignal<Bill>,
    ) -> Result<Self> {
        let (state_tx, state) = watch::channel(CustomerState::Ordering);
        let state_tx = Arc::new(state_tx);

        let mut runtime = AgentRuntime::new(AgentId::customer(customer_num), bus)
            .with_shutdown_timeout(config.receive.shutdown_timeout);
        runtime.add_behavior(HandleBill {
            customer_num,
            billing: config.directory.billing.clone(),
            manager: config.directory.manager.clone(),
            payment: config.timings.customer_payment,
            receive_timeout: config.receive.customer_timeout,
            state: Arc::clone(&state_tx),
            completion: Some(completion),
        })?;

        Ok(Self {
            customer_num,
            runtime,
            order_desk: config.directory.order.clone(),
            settle: config.timings.customer_settle,
            state_tx,
            state,
        })
    }

    pub fn customer_num(&self) -> u32 {
        self.customer_num
    }

    pub fn id(&self) -> &AgentId {
        self.runtime.id()
    }

    pub fn agent_state(&self) -> AgentState {
        self.runtime.state()
    }

    pub async fn start(&mut self) -> Result<()> {
        self.runtime.start().await?;
        tracing::info!(customer_num = self.customer_num, "Customer arrived");
        Ok(())
    }

    /// Queue the order. Sent after the settle delay once the agent is running.
    pub fn send_order(&mut self, item: impl Into<String>) -> Result<()> {
        self.runtime.add_behavior(SendOrder {
            customer_num: self.customer_num,
            item: item.into(),
            order_desk: self.order_desk.clone(),
            settle: self.settle,
            state: Arc::clone(&self.state_tx),
        })
    }

    pub fn state(&self) -> CustomerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<CustomerState> {
        self.state.clone()
    }

    /// Safe whether or not the session completed.
    pub async fn stop(&mut self) {
        self.runtime.stop().await;
    }
}

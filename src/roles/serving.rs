//! Serving role - assigns a server, serves the meal, waits out dining, requests payment.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::bus::{meta, Message, MessageKind};
use crate::runtime::{AgentContext, Behavior, Flow};
use crate::timing::Jitter;
use crate::types::{AgentId, Config, DelayRange, Result};

/// Number of servers on the floor.
pub const SERVERS: u32 = 3;

/// Server for a customer key: 32-bit FNV-1a of the key bytes, mod 3, plus 1.
pub fn server_for(customer_key: &str) -> u8 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let hash = customer_key
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u32::from(b)).wrapping_mul(FNV_PRIME));
    // SERVERS is tiny, the cast cannot truncate
    (hash % SERVERS) as u8 + 1
}

/// Customer key → server id. Private to the serving agent.
#[derive(Debug, Default)]
pub struct ServerAssignments {
    table: HashMap<String, u8>,
}

impl ServerAssignments {
    /// Server for `customer_key`, recording it on first sight.
    pub fn assign(&mut self, customer_key: &str) -> u8 {
        *self
            .table
            .entry(customer_key.to_string())
            .or_insert_with(|| server_for(customer_key))
    }

    pub fn get(&self, customer_key: &str) -> Option<u8> {
        self.table.get(customer_key).copied()
    }

    /// Forget the customer once their table is handed to billing.
    pub fn release(&mut self, customer_key: &str) -> Option<u8> {
        self.table.remove(customer_key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Cyclic behavior of the serving agent.
///
/// One meal at a time: a server stays with the table until the customer
/// has finished eating.
#[derive(Debug)]
pub struct ServeMeals {
    billing: AgentId,
    serving: Duration,
    dining: DelayRange,
    receive_timeout: Duration,
    jitter: Arc<dyn Jitter>,
    assignments: ServerAssignments,
}

impl ServeMeals {
    pub fn new(config: &Config, jitter: Arc<dyn Jitter>) -> Self {
        Self {
            billing: config.directory.billing.clone(),
            serving: config.timings.serving,
            dining: config.simulation.dining_time,
            receive_timeout: config.receive.staff_timeout,
            jitter,
            assignments: ServerAssignments::default(),
        }
    }

    async fn serve(&mut self, ctx: &AgentContext, meal: Message) -> Result<()> {
        let customer_jid = meal.meta(meta::CUSTOMER_JID).unwrap_or_default().to_string();
        let server_id = self.assignments.assign(&customer_jid);
        tracing::info!(server_id, order = %meal.body, "Received meal to serve");

        ctx.pause(self.serving).await;
        tracing::info!(server_id, customer = %customer_jid, "Serving meal to customer");

        let dining = self.jitter.sample(self.dining);
        ctx.pause(dining).await;

        let mut request = Message::new(ctx.id().clone(), self.billing.clone(), MessageKind::PaymentDue)
            .with_meta(meta::CUSTOMER_JID, &customer_jid)
            .with_meta(meta::SERVER_ID, server_id)
            .with_body(meal.body.clone());
        if let Some(num) = meal.meta(meta::CUSTOMER_NUM) {
            request = request.with_meta(meta::CUSTOMER_NUM, num);
        }
        let sent = ctx.send(request).await;
        self.assignments.release(&customer_jid);
        sent?;

        tracing::info!(server_id, dined_for = ?dining, "Customer finished dining; billing notified");
        Ok(())
    }
}

#[async_trait]
impl Behavior for ServeMeals {
    fn name(&self) -> &'static str {
        "serve_meals"
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        let Some(msg) = ctx.receive(self.receive_timeout).await else {
            return Ok(Flow::Continue);
        };

        match msg.kind() {
            Some(MessageKind::MealReady) => self.serve(ctx, msg).await?,
            other => tracing::debug!(kind = ?other, from = %msg.from, "Serving ignores message"),
        }
        Ok(Flow::Continue)
    }
}

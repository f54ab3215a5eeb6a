//! Customer sessions and the orchestrator that runs them.
//!
//! A session is one customer agent plus the single-use signal it fires when
//! it has paid and left. The orchestrator waits on that signal with a bounded
//! timeout and always tears the agent down afterwards, whatever the outcome.

mod orchestrator;
mod signal;

pub use orchestrator::Orchestrator;
pub use signal::{completion, Completion, CompletionSignal, CompletionWaiter};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::bus::{BusStats, MessageBus};
use crate::menu::{MenuItem, Money};
use crate::roles::{Bill, Customer, CustomerState};
use crate::types::{Config, Error, Result};

/// One customer's visit, from arrival to teardown.
#[derive(Debug)]
pub struct CustomerSession {
    customer_num: u32,
    order: MenuItem,
    customer: Customer,
    waiter: Option<CompletionWaiter<Bill>>,
}

impl CustomerSession {
    /// Start the customer agent and queue its order.
    pub async fn begin(
        bus: MessageBus,
        config: &Config,
        customer_num: u32,
        order: MenuItem,
    ) -> Result<Self> {
        let (signal, waiter) = completion();
        let mut customer = Customer::new(customer_num, bus, config, signal)?;
        customer.start().await?;
        if let Err(e) = customer.send_order(order.name.clone()) {
            customer.stop().await;
            return Err(e);
        }

        Ok(Self {
            customer_num,
            order,
            customer,
            waiter: Some(waiter),
        })
    }

    pub fn customer_num(&self) -> u32 {
        self.customer_num
    }

    pub fn order(&self) -> &MenuItem {
        &self.order
    }

    pub fn state(&self) -> CustomerState {
        self.customer.state()
    }

    /// Bounded wait on the completion signal. The signal can be observed once.
    pub async fn wait(&mut self, timeout: Duration) -> Result<Completion<Bill>> {
        let waiter = self.waiter.take().ok_or_else(|| {
            Error::state_transition(format!(
                "completion of customer {} already observed",
                self.customer_num
            ))
        })?;
        Ok(waiter.wait(timeout).await)
    }

    /// Stop the customer agent. Safe whether or not the signal fired.
    pub async fn end(mut self) {
        self.customer.stop().await;
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SessionOutcome {
    Completed(Bill),
    /// No completion within the session timeout.
    TimedOut { last_state: CustomerState },
    /// Cut short by shutdown, or the customer never got going.
    Abandoned,
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub customer_num: u32,
    pub order: String,
    #[serde(flatten)]
    pub outcome: SessionOutcome,
}

impl SessionReport {
    pub fn bill(&self) -> Option<&Bill> {
        match &self.outcome {
            SessionOutcome::Completed(bill) => Some(bill),
            _ => None,
        }
    }
}

/// Summary of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub sessions: Vec<SessionReport>,
    pub bus: BusStats,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.sessions.iter().filter(|s| s.outcome.is_completed()).count()
    }

    pub fn timed_out(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| matches!(s.outcome, SessionOutcome::TimedOut { .. }))
            .count()
    }

    pub fn abandoned(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.outcome == SessionOutcome::Abandoned)
            .count()
    }

    /// Sum of paid totals.
    pub fn revenue(&self) -> Money {
        self.sessions
            .iter()
            .filter_map(SessionReport::bill)
            .fold(Money::ZERO, |sum, bill| sum + bill.total)
    }

    pub fn session(&self, customer_num: u32) -> Option<&SessionReport> {
        self.sessions.iter().find(|s| s.customer_num == customer_num)
    }
}

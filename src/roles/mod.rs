//! Restaurant roles.
//!
//! Each staff role is one cyclic behavior that dispatches on the message
//! kind tag. Roles keep no per-session state apart from serving's server
//! table; everything a role needs travels in message metadata.
//!
//! ```text
//!   customer ──orderPlaced──► order ──► kitchen ──mealReady──► serving
//!      ▲                                                          │
//!      └──────────billIssued────── billing ◄──paymentDue──────────┘
//!   customer ──paymentConfirmed──► billing
//!   customer ──departed──► manager ──cleanupRequested──► cleaning
//! ```

pub mod billing;
pub mod cleaning;
pub mod customer;
pub mod kitchen;
pub mod manager;
pub mod order;
pub mod serving;

pub use billing::{Bill, SettleBills};
pub use cleaning::{CleanTables, TableTally};
pub use customer::{Customer, CustomerState};
pub use kitchen::PrepareMeals;
pub use manager::Supervise;
pub use order::TakeOrders;
pub use serving::{server_for, ServeMeals, ServerAssignments};

use std::sync::Arc;

use crate::bus::MessageBus;
use crate::runtime::{AgentRuntime, Behavior};
use crate::timing::Jitter;
use crate::types::{AgentId, Config, Error, Result};

/// The six staff agents, running.
#[derive(Debug)]
pub struct Staff {
    agents: Vec<(&'static str, AgentRuntime)>,
}

impl Staff {
    /// Bring up every staff agent. If any fails to start, the ones already
    /// running are stopped and the run cannot proceed.
    pub async fn start(bus: MessageBus, config: &Config, jitter: Arc<dyn Jitter>) -> Result<Self> {
        let dir = &config.directory;
        let roster: [(&'static str, &AgentId, Box<dyn Behavior>); 6] = [
            ("order", &dir.order, Box::new(TakeOrders::new(config))),
            ("kitchen", &dir.kitchen, Box::new(PrepareMeals::new(config))),
            ("serving", &dir.serving, Box::new(ServeMeals::new(config, jitter))),
            ("billing", &dir.billing, Box::new(SettleBills::new(config))),
            ("cleaning", &dir.cleaning, Box::new(CleanTables::new(config))),
            ("manager", &dir.manager, Box::new(Supervise::new(config))),
        ];

        let mut staff = Self { agents: Vec::with_capacity(roster.len()) };
        for (role, id, behavior) in roster {
            let mut agent = AgentRuntime::new(id.clone(), bus.clone())
                .with_shutdown_timeout(config.receive.shutdown_timeout);
            let started = match agent.add_boxed_behavior(behavior) {
                Ok(()) => agent.start().await,
                Err(e) => Err(e),
            };
            if let Err(e) = started {
                tracing::error!(role, agent = %id, error = %e, "Staff agent failed to start");
                staff.stop().await;
                return Err(Error::agent_startup(format!("{role}: {e}")));
            }
            tracing::info!(role, agent = %id, "Staff agent started");
            staff.agents.push((role, agent));
        }
        Ok(staff)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn is_running(&self) -> bool {
        !self.agents.is_empty() && self.agents.iter().all(|(_, agent)| agent.is_running())
    }

    /// Stop all staff agents concurrently.
    pub async fn stop(&mut self) {
        futures::future::join_all(self.agents.iter_mut().map(|(_, agent)| agent.stop())).await;
        tracing::info!(agents = self.agents.len(), "Staff stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ThreadJitter;

    #[tokio::test]
    async fn test_staff_registers_every_role() {
        let config = Config::default();
        let bus = MessageBus::new();
        let mut staff = Staff::start(bus.clone(), &config, Arc::new(ThreadJitter))
            .await
            .unwrap();

        assert_eq!(staff.len(), 6);
        assert!(staff.is_running());
        for (_, id) in config.directory.entries() {
            assert!(bus.is_registered(id).await, "{id} not registered");
        }

        staff.stop().await;
        assert!(!staff.is_running());
        assert_eq!(bus.stats().await.registered_mailboxes, 0);
    }

    #[tokio::test]
    async fn test_startup_failure_is_fatal_and_rolls_back() {
        let config = Config::default();
        let bus = MessageBus::new();
        // squatter on the billing address
        let _squatter = bus.register(config.directory.billing.clone()).await.unwrap();

        let err = Staff::start(bus.clone(), &config, Arc::new(ThreadJitter))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AgentStartup(ref msg) if msg.starts_with("billing")));

        // agents started before billing were stopped again
        assert!(!bus.is_registered(&config.directory.order).await);
        assert!(!bus.is_registered(&config.directory.serving).await);
        assert!(bus.is_registered(&config.directory.billing).await);
    }
}

//! Session orchestrator - opens the restaurant, admits customers, closes up.

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{Completion, CustomerSession, RunReport, SessionOutcome, SessionReport};
use crate::bus::MessageBus;
use crate::menu::{Menu, MenuItem};
use crate::roles::Staff;
use crate::timing::Jitter;
use crate::types::{Config, Error, Result};

/// Drives one simulation run. Clones share the bus and the shutdown token.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<Config>,
    bus: MessageBus,
    jitter: Arc<dyn Jitter>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: Config, jitter: Arc<dyn Jitter>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            bus: MessageBus::new(),
            jitter,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Cancelling this token stops admissions and ends pending session waits.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bring up all staff. Failure here is fatal for the run.
    pub async fn open(&self) -> Result<Staff> {
        Staff::start(self.bus.clone(), &self.config, Arc::clone(&self.jitter)).await
    }

    /// Run one customer session to its outcome and tear the customer down.
    pub async fn run_session(&self, customer_num: u32, order: MenuItem) -> SessionReport {
        let order_name = order.name.clone();
        let report = |outcome| SessionReport {
            customer_num,
            order: order_name.clone(),
            outcome,
        };

        let mut session =
            match CustomerSession::begin(self.bus.clone(), &self.config, customer_num, order).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!(customer_num, error = %e, "Customer could not be seated");
                    return report(SessionOutcome::Abandoned);
                }
            };
        tracing::info!(customer_num, order = %order_name, "Customer seated");

        let timeout = self.config.simulation.session_timeout;
        let waited = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            done = session.wait(timeout) => Some(done),
        };

        let outcome = match waited {
            Some(Ok(Completion::Fired(bill))) => {
                tracing::info!(customer_num, total = %bill.total, "Session completed");
                self.linger().await;
                SessionOutcome::Completed(bill)
            }
            Some(Ok(Completion::TimedOut)) => {
                let last_state = session.state();
                let e = Error::SessionTimeout {
                    customer_num,
                    waited: timeout,
                };
                tracing::warn!(customer_num, %last_state, error = %e, "Abandoning session");
                SessionOutcome::TimedOut { last_state }
            }
            Some(Ok(Completion::Dropped)) => {
                tracing::warn!(customer_num, "Customer left without completing");
                SessionOutcome::Abandoned
            }
            Some(Err(e)) => {
                tracing::error!(customer_num, error = %e, "Session wait failed");
                SessionOutcome::Abandoned
            }
            None => {
                tracing::info!(customer_num, state = %session.state(), "Shutdown during session");
                SessionOutcome::Abandoned
            }
        };

        session.end().await;
        report(outcome)
    }

    /// Open, admit every customer, close. Only a staff startup failure is an error.
    pub async fn run(&self) -> Result<RunReport> {
        let opened_at = Utc::now();
        let menu = Menu::new(self.config.menu.clone());
        if menu.is_empty() {
            return Err(Error::config("menu must not be empty"));
        }

        let mut staff = self.open().await?;
        let customers = self.jitter.count(self.config.simulation.customers);
        tracing::info!(customers, "Restaurant open");

        let mut sessions = JoinSet::new();
        for customer_num in 1..=customers {
            let arrival = self.jitter.sample(self.config.simulation.arrival_delay);
            let arrived = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => false,
                _ = tokio::time::sleep(arrival) => true,
            };
            if !arrived {
                tracing::info!(admitted = customer_num - 1, "Shutdown requested; no more customers");
                break;
            }

            let Some(order) = menu.pick(self.jitter.pick(menu.len())).cloned() else {
                break;
            };
            let this = self.clone();
            sessions.spawn(async move { this.run_session(customer_num, order).await });
        }

        let mut reports = Vec::with_capacity(sessions.len());
        while let Some(joined) = sessions.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(error = %e, "Session task failed"),
            }
        }
        reports.sort_by_key(|r| r.customer_num);

        self.wait_unless_shutdown(self.config.simulation.closing_delay).await;
        staff.stop().await;

        let report = RunReport {
            opened_at,
            closed_at: Utc::now(),
            sessions: reports,
            bus: self.bus.stats().await,
        };
        tracing::info!(
            completed = report.completed(),
            timed_out = report.timed_out(),
            abandoned = report.abandoned(),
            revenue = %report.revenue(),
            "Restaurant closed"
        );
        Ok(report)
    }

    async fn linger(&self) {
        self.wait_unless_shutdown(self.config.simulation.completion_linger).await;
    }

    async fn wait_unless_shutdown(&self, delay: std::time::Duration) {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CountRange, DelayRange};
    use crate::timing::ScriptedJitter;
    use std::time::Duration;

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.simulation.customers = CountRange::exactly(1);
        config
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.menu.clear();
        let err = Orchestrator::new(config, Arc::new(ScriptedJitter::new())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_customer_run() {
        let config = quick_config();
        let menu = Menu::new(config.menu.clone());
        let salad = config
            .menu
            .iter()
            .position(|item| item.name == "Salad and water")
            .unwrap();
        let jitter = ScriptedJitter::new().with_picks([salad]);
        let orchestrator = Orchestrator::new(config, Arc::new(jitter)).unwrap();

        let report = orchestrator.run().await.unwrap();
        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.completed(), 1);

        let bill = report.session(1).unwrap().bill().unwrap();
        assert_eq!(bill.subtotal, menu.price("Salad and water").unwrap());
        assert_eq!(bill.total.to_string(), "17.27");
        assert!(report.closed_at >= report.opened_at);
        // all agents gone
        assert_eq!(report.bus.registered_mailboxes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_arrival() {
        let mut config = quick_config();
        config.simulation.arrival_delay = DelayRange::from_secs(5, 5);
        let orchestrator = Orchestrator::new(config, Arc::new(ScriptedJitter::new())).unwrap();

        orchestrator.shutdown_token().cancel();
        let report = orchestrator.run().await.unwrap();

        assert!(report.sessions.is_empty());
        assert_eq!(report.bus.registered_mailboxes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_waiting_session() {
        let orchestrator =
            Orchestrator::new(quick_config(), Arc::new(ScriptedJitter::new())).unwrap();
        let token = orchestrator.shutdown_token();

        // no staff is up, so the order can never be served
        let _order_desk = orchestrator
            .bus()
            .register(orchestrator.config().directory.order.clone())
            .await
            .unwrap();
        let session = {
            let this = orchestrator.clone();
            let item = this.config().menu[0].clone();
            tokio::spawn(async move { this.run_session(1, item).await })
        };

        tokio::time::sleep(Duration::from_secs(10)).await;
        token.cancel();
        let report = session.await.unwrap();

        assert_eq!(report.outcome, SessionOutcome::Abandoned);
        assert!(!orchestrator
            .bus()
            .is_registered(&crate::types::AgentId::customer(1))
            .await);
    }
}

//! Configuration structures.
//!
//! Configuration is built from defaults and optionally overridden by a JSON file.
//! Every section defaults independently, so a file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use super::{AgentId, Error, Result};
use crate::menu::{MenuItem, Money};

/// Global simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Static price table, in display order.
    #[serde(default = "default_menu")]
    pub menu: Vec<MenuItem>,

    /// Mailbox addresses of the staff agents.
    #[serde(default)]
    pub directory: Directory,

    /// Customer arrival and session bounds.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Fixed per-role work delays.
    #[serde(default)]
    pub timings: RoleTimings,

    /// Receive and shutdown bounds.
    #[serde(default)]
    pub receive: ReceiveConfig,

    #[serde(default)]
    pub billing: BillingConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            menu: default_menu(),
            directory: Directory::default(),
            simulation: SimulationConfig::default(),
            timings: RoleTimings::default(),
            receive: ReceiveConfig::default(),
            billing: BillingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_menu() -> Vec<MenuItem> {
    [
        ("Pizza and soda", 2599),
        ("Burger and fries", 1899),
        ("Pasta and wine", 3299),
        ("Salad and water", 1599),
        ("Steak and wine", 4599),
        ("Fish and chips", 2299),
        ("Chicken curry and rice", 2899),
    ]
    .into_iter()
    .map(|(name, cents)| MenuItem::new(name, Money::from_cents(cents)))
    .collect()
}

impl Config {
    /// Load a JSON config file; missing sections fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the orchestrator cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.menu.is_empty() {
            return Err(Error::config("menu must have at least one item"));
        }
        let mut names = HashSet::new();
        for item in &self.menu {
            if !names.insert(item.name.as_str()) {
                return Err(Error::config(format!("duplicate menu item: {}", item.name)));
            }
        }

        self.simulation.customers.validate("simulation.customers")?;
        self.simulation.arrival_delay.validate("simulation.arrival_delay")?;
        self.simulation.dining_time.validate("simulation.dining_time")?;
        if self.simulation.session_timeout.is_zero() {
            return Err(Error::config("simulation.session_timeout must be positive"));
        }
        if self.receive.customer_timeout.is_zero() || self.receive.staff_timeout.is_zero() {
            return Err(Error::config("receive timeouts must be positive"));
        }

        let mut seen = HashSet::new();
        for (role, id) in self.directory.entries() {
            if id.as_str().trim().is_empty() {
                return Err(Error::config(format!("directory.{role} is blank")));
            }
            // customers register under customer<N>_agent@localhost at runtime
            if id.is_customer_address() {
                return Err(Error::config(format!(
                    "directory.{role} uses customer address {id}"
                )));
            }
            if !seen.insert(id) {
                return Err(Error::config(format!(
                    "directory.{role} reuses agent id {id}"
                )));
            }
        }
        Ok(())
    }
}

/// Addresses of the six staff agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Directory {
    pub order: AgentId,
    pub kitchen: AgentId,
    pub serving: AgentId,
    pub billing: AgentId,
    pub cleaning: AgentId,
    pub manager: AgentId,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            order: AgentId::must("order_agent@localhost"),
            kitchen: AgentId::must("kitchen_agent@localhost"),
            serving: AgentId::must("serving_agent@localhost"),
            billing: AgentId::must("billing_agent@localhost"),
            cleaning: AgentId::must("cleaning_agent@localhost"),
            manager: AgentId::must("manager_agent@localhost"),
        }
    }
}

impl Directory {
    /// Role name and address pairs, in pipeline order.
    pub fn entries(&self) -> [(&'static str, &AgentId); 6] {
        [
            ("order", &self.order),
            ("kitchen", &self.kitchen),
            ("serving", &self.serving),
            ("billing", &self.billing),
            ("cleaning", &self.cleaning),
            ("manager", &self.manager),
        ]
    }
}

/// Inclusive bounds for a uniformly sampled delay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DelayRange {
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl DelayRange {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn contains(&self, d: Duration) -> bool {
        self.min <= d && d <= self.max
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.min > self.max {
            return Err(Error::config(format!("{field}: min exceeds max")));
        }
        Ok(())
    }
}

/// Inclusive bounds for a sampled count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub const fn exactly(n: u32) -> Self {
        Self::new(n, n)
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.min > self.max {
            return Err(Error::config(format!("{field}: min exceeds max")));
        }
        Ok(())
    }
}

/// Customer arrival and session bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// How many customers visit during one run.
    pub customers: CountRange,

    /// Wait before each customer arrives.
    pub arrival_delay: DelayRange,

    /// Time a served customer spends eating.
    pub dining_time: DelayRange,

    /// Bounded wait on a session's completion signal.
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Pause after a session completes before its agent is stopped.
    #[serde(with = "humantime_serde")]
    pub completion_linger: Duration,

    /// Pause after the last session before staff is sent home.
    #[serde(with = "humantime_serde")]
    pub closing_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            customers: CountRange::new(3, 8),
            arrival_delay: DelayRange::from_secs(1, 10),
            dining_time: DelayRange::from_secs(5, 15),
            session_timeout: Duration::from_secs(120),
            completion_linger: Duration::from_secs(5),
            closing_delay: Duration::from_secs(5),
        }
    }
}

/// Fixed work delays per role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleTimings {
    /// Customer settles in before ordering.
    #[serde(with = "humantime_serde")]
    pub customer_settle: Duration,

    /// Customer processes a bill before paying.
    #[serde(with = "humantime_serde")]
    pub customer_payment: Duration,

    #[serde(with = "humantime_serde")]
    pub kitchen_preparation: Duration,

    /// Carrying the meal to the table, before dining starts.
    #[serde(with = "humantime_serde")]
    pub serving: Duration,

    #[serde(with = "humantime_serde")]
    pub billing: Duration,

    #[serde(with = "humantime_serde")]
    pub cleaning: Duration,
}

impl Default for RoleTimings {
    fn default() -> Self {
        Self {
            customer_settle: Duration::from_secs(2),
            customer_payment: Duration::from_secs(2),
            kitchen_preparation: Duration::from_secs(5),
            serving: Duration::from_secs(3),
            billing: Duration::from_secs(2),
            cleaning: Duration::from_secs(2),
        }
    }
}

/// Receive and shutdown bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveConfig {
    /// Idle-poll interval of the customer's bill loop.
    #[serde(with = "humantime_serde")]
    pub customer_timeout: Duration,

    /// Idle-poll interval of every staff loop.
    #[serde(with = "humantime_serde")]
    pub staff_timeout: Duration,

    /// How long `stop()` waits for cancelled behaviors to unwind.
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            customer_timeout: Duration::from_secs(10),
            staff_timeout: Duration::from_secs(20),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Sales tax in basis points (800 = 8%).
    pub tax_rate_bp: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self { tax_rate_bp: 800 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

//! Core types for the restaurant runtime.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (AgentId, MessageId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for menu, staff, timings and runs

mod config;
mod errors;
mod ids;

pub use config::{
    BillingConfig, Config, CountRange, DelayRange, Directory, ObservabilityConfig, ReceiveConfig,
    RoleTimings, SimulationConfig,
};
pub use errors::{Error, Result};
pub use ids::{AgentId, MessageId};

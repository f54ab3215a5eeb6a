//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use std::time::Duration;
use thiserror::Error;

use super::AgentId;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the restaurant runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// No live mailbox is registered for the addressed agent.
    #[error("recipient not found: {0}")]
    RecipientNotFound(AgentId),

    /// A mailbox with this id is already live on the bus.
    #[error("agent already registered: {0}")]
    AlreadyRegistered(AgentId),

    /// A customer's completion signal did not fire within the bounded wait.
    #[error("session timeout: customer {customer_num} not done after {waited:?}")]
    SessionTimeout { customer_num: u32, waited: Duration },

    /// The agent was stopped; it may not act any more.
    #[error("agent stopped: {0}")]
    Stopped(AgentId),

    /// Order text that has no price on the menu.
    #[error("unknown menu item: {0}")]
    UnknownMenuItem(String),

    /// A staff agent could not be brought up; fatal for a run.
    #[error("agent startup failed: {0}")]
    AgentStartup(String),

    /// Invalid agent lifecycle transition.
    #[error("state transition error: {0}")]
    StateTransition(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Malformed message or value.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn agent_startup(msg: impl Into<String>) -> Self {
        Self::AgentStartup(msg.into())
    }

    pub fn state_transition(msg: impl Into<String>) -> Self {
        Self::StateTransition(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_recipient_not_found(&self) -> bool {
        matches!(self, Error::RecipientNotFound(_))
    }

    pub fn is_session_timeout(&self) -> bool {
        matches!(self, Error::SessionTimeout { .. })
    }
}

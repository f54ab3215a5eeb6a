//! Agent lifecycle states.

use serde::{Deserialize, Serialize};

/// Agent lifecycle state.
///
/// State transitions:
/// ```text
/// CREATED → RUNNING → STOPPED
///     └───────────────↗
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Behaviors may be added; no mailbox yet.
    Created,
    /// Mailbox registered, behaviors scheduled.
    Running,
    /// Behaviors cancelled, mailbox unregistered.
    Stopped,
}

impl AgentState {
    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        self == AgentState::Stopped
    }

    /// Check if transition is valid.
    pub fn can_transition_to(self, to: AgentState) -> bool {
        matches!(
            (self, to),
            (AgentState::Created, AgentState::Running)
                | (AgentState::Created, AgentState::Stopped)
                | (AgentState::Running, AgentState::Stopped)
        )
    }
}

//! # Trattoria - Multi-Agent Restaurant Simulation
//!
//! Independent agents exchange addressed messages to run a restaurant:
//! - In-memory message bus with one FIFO mailbox per agent
//! - Agent runtime hosting one-shot and cyclic behaviors
//! - Seven role state machines (customer and six staff roles)
//! - Per-customer sessions with a single-use completion signal and timeout
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────────────┐
//!   Orchestrator  →   │            MessageBus            │
//!     │   sessions    │  agent id → mailbox (mpsc queue) │
//!     ▼               └──────────────────────────────────┘
//!   Customer ↔ Order ↔ Kitchen ↔ Serving ↔ Billing ↔ Manager ↔ Cleaning
//! ```
//!
//! Every wait is bounded: mailbox receives time out into an idle poll and
//! session waits time out into an abandoned session. Delays come from an
//! injectable [`timing::Jitter`] so runs can be replayed exactly in tests.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod menu;
pub mod roles;
pub mod runtime;
pub mod session;
pub mod timing;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};

//! Log output for the simulation binary and tests.
//!
//! Every agent logs through `tracing` with `customer_num`, `server_id` and
//! similar fields. This module only decides where those events go.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::types::ObservabilityConfig;

static SUBSCRIBER: OnceLock<()> = OnceLock::new();

/// Set to `json` to force JSON lines regardless of `json_logs`.
pub const LOG_FORMAT_ENV: &str = "TRATTORIA_LOG_FORMAT";

/// Line format of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// `override_value` is the raw `TRATTORIA_LOG_FORMAT` value, if any.
    pub fn resolve(config: &ObservabilityConfig, override_value: Option<&str>) -> Self {
        let forced = override_value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"));
        if config.json_logs || forced {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

/// `RUST_LOG`, then the configured level, then `info`.
fn level_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(config: &ObservabilityConfig) {
    SUBSCRIBER.get_or_init(|| {
        let env_format = std::env::var(LOG_FORMAT_ENV).ok();
        let format = LogFormat::resolve(config, env_format.as_deref());
        let registry = tracing_subscriber::registry().with(level_filter(config));

        let installed = match format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        };
        // a test harness may own the global subscriber already
        if let Err(err) = installed {
            eprintln!("log subscriber not installed: {err}");
        }
    });
}

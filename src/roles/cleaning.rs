//! Cleaning role - resets tables after customers leave.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::bus::{meta, MessageKind};
use crate::runtime::{AgentContext, Behavior, Flow};
use crate::types::{Config, Result};

/// Shared count of tables reset so far. Readable after the behavior moves into a runtime.
#[derive(Debug, Clone, Default)]
pub struct TableTally(Arc<AtomicU64>);

impl TableTally {
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Cyclic behavior of the cleaning agent. Terminal sink, sends nothing.
#[derive(Debug)]
pub struct CleanTables {
    cleaning: Duration,
    receive_timeout: Duration,
    tally: TableTally,
}

impl CleanTables {
    pub fn new(config: &Config) -> Self {
        Self {
            cleaning: config.timings.cleaning,
            receive_timeout: config.receive.staff_timeout,
            tally: TableTally::default(),
        }
    }

    pub fn tally(&self) -> TableTally {
        self.tally.clone()
    }
}

#[async_trait]
impl Behavior for CleanTables {
    fn name(&self) -> &'static str {
        "clean_tables"
    }

    async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
        let Some(msg) = ctx.receive(self.receive_timeout).await else {
            return Ok(Flow::Continue);
        };

        match msg.kind() {
            Some(MessageKind::CleanupRequested) => {
                tracing::info!(request = %msg.body, "Cleaning table");
                ctx.pause(self.cleaning).await;
                let tables_cleaned = self.tally.bump();
                tracing::info!(
                    customer_num = msg.meta(meta::CUSTOMER_NUM).unwrap_or("unknown"),
                    tables_cleaned,
                    "Table cleaned"
                );
            }
            other => tracing::debug!(kind = ?other, from = %msg.from, "Cleaning ignores message"),
        }
        Ok(Flow::Continue)
    }
}

//! Trattoria simulation - main entry point.
//!
//! Opens the restaurant, admits a random number of customers and prints a
//! summary once everyone has been served or given up on. Ctrl-C stops
//! admissions and closes early.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use trattoria::session::{Orchestrator, SessionOutcome};
use trattoria::timing::{Jitter, SeededJitter, ThreadJitter};
use trattoria::types::CountRange;
use trattoria::Config;

#[derive(Debug, Parser)]
#[command(name = "trattoria-sim", version, about = "Multi-agent restaurant simulation")]
struct Args {
    /// JSON config file; missing sections use defaults
    #[arg(short, long, env = "TRATTORIA_CONFIG")]
    config: Option<PathBuf>,

    /// Exact number of customers instead of the configured range
    #[arg(short = 'n', long)]
    customers: Option<u32>,

    /// Seed for reproducible delays and orders
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the run report as JSON
    #[arg(long)]
    report_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(n) = args.customers {
        config.simulation.customers = CountRange::exactly(n);
    }

    trattoria::observability::init_tracing(&config.observability);

    let jitter: Arc<dyn Jitter> = match args.seed {
        Some(seed) => Arc::new(SeededJitter::new(seed)),
        None => Arc::new(ThreadJitter),
    };
    let orchestrator = Orchestrator::new(config, jitter)?;

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; closing the restaurant");
            shutdown.cancel();
        }
    });

    let report = orchestrator.run().await?;

    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Restaurant closed after {} customers", report.sessions.len());
    for session in &report.sessions {
        match &session.outcome {
            SessionOutcome::Completed(bill) => println!(
                "  customer {}: {} - paid ${} (server #{})",
                session.customer_num,
                session.order,
                bill.total,
                bill.server_id.map_or_else(|| "?".to_string(), |id| id.to_string())
            ),
            SessionOutcome::TimedOut { last_state } => println!(
                "  customer {}: {} - timed out while {}",
                session.customer_num, session.order, last_state
            ),
            SessionOutcome::Abandoned => println!(
                "  customer {}: {} - abandoned",
                session.customer_num, session.order
            ),
        }
    }
    println!(
        "completed {}, timed out {}, abandoned {}, revenue ${}",
        report.completed(),
        report.timed_out(),
        report.abandoned(),
        report.revenue()
    );
    Ok(())
}

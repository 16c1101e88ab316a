//! Ad ledger service launcher.
//!
//! One binary runs any of the four services:
//!
//! ```text
//!                 ┌──────────────────────────┐   /init_rate, /query_bumps,   ┌─────────────────────┐
//!   client ──────▶│ manager (orchestrator)   │──── /delete_rate ────────────▶│ visits (counters)   │
//!                 │ advertiser/ad/site ledger│   traceparent when traced     │ advertisement_rate  │
//!                 └──────────────────────────┘                               └─────────────────────┘
//!
//!                 ┌──────────────────────────┐   /fetch + traceparent        ┌─────────────────────┐
//!   client ──────▶│ sender (probe)           │──────────────────────────────▶│ receiver (probe)    │
//!                 └──────────────────────────┘                               └─────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ad_ledger::config::{load_config, LedgerConfig};
use ad_ledger::lifecycle::{launch, Service};
use ad_ledger::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "ad-ledger", version, about = "Ad ledger microservices")]
struct Cli {
    /// Service to run
    #[arg(value_enum)]
    service: Service,

    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => LedgerConfig::default(),
    };

    init_logging(&config.observability)?;

    tracing::info!(
        service = cli.service.name(),
        config = ?cli.config,
        bind_address = cli.service.bind_address(&config),
        "ad-ledger v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    launch(cli.service, config).await?;
    Ok(())
}

//! Chat relay.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /messages ──▶ http ──▶ relay ──▶ conversation queue + history
//!                                   │                 ▲
//!                               enrichment            │ snapshot / append reply
//!                                                     │
//!                    processing loop ──▶ executor ────┘
//!                          │                 │
//!                   circuit breaker    dispatcher ──▶ delivery
//!                   error streak       retry/backoff
//!                   restart cooldown
//!
//!     /admin/* ──▶ admin ──▶ processing loop (status, start, stop)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use chat_relay::config::load_or_default;
use chat_relay::lifecycle::{App, ExitReason};
use chat_relay::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(about = "Chat message relay with a self-healing reply scheduler", long_about = None)]
struct Cli {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chat-relay starting");

    tracing::info!(
        ingest = %config.ingest.bind_address,
        admin_enabled = config.admin.enabled,
        dispatcher = %config.dispatcher.endpoint,
        delivery = %config.delivery.endpoint,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let app = App::build(config)?;
    let reason = app.run().await?;

    match reason {
        ExitReason::Signal => {
            tracing::info!("Shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
        ExitReason::FatalConflict(reason) => {
            tracing::error!(reason = %reason, "Exiting after fatal conflict");
            Ok(ExitCode::from(1))
        }
    }
}

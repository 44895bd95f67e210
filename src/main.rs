//! kbot
//!
//! A Telegram bot with a full observability stack.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                        KBOT                          │
//!   Telegram       │  ┌───────────┐    ┌────────────┐    ┌────────────┐   │
//!   Bot API  ◀─────┼─▶│ transport │───▶│  pipeline  │───▶│ dispatcher │   │
//!  (long poll)     │  │  poller   │    │ root span  │    │ cmd span   │   │
//!                  │  └───────────┘    └─────┬──────┘    └─────┬──────┘   │
//!                  │        ▲                │                 │          │
//!                  │        └─────── reply ──┼─────────────────┘          │
//!                  │                         ▼                            │
//!                  │  ┌──────────────────────────────────────────────┐    │
//!                  │  │            Cross-Cutting Concerns             │    │
//!   Prometheus ◀───┼──│  metrics (/metrics)   tracer (OTLP)  logging  │────┼──▶ OTEL
//!                  │  │  config (env)         lifecycle (signals)     │    │  Collector
//!                  │  └──────────────────────────────────────────────┘    │
//!                  └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Commands
//! - `hello` - greeting with the running version
//! - `time`  - current local time
//! - anything else - a short help message

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use kbot::config::loader;
use kbot::observability::logging;
use kbot::VERSION;

#[derive(Parser)]
#[command(name = "kbot")]
#[command(about = "Telegram bot with observability", version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (metrics on /metrics, probes on /health and /ready)
    #[command(visible_alias = "kbot")]
    Start,
    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("{VERSION}");
            ExitCode::SUCCESS
        }
        Commands::Start => start().await,
    }
}

async fn start() -> ExitCode {
    if let Err(e) = logging::init(&loader::logging_from_env()) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(version = %VERSION, "kbot starting");

    let config = match loader::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        metrics_port = config.metrics.port,
        tracing_enabled = config.tracing.is_enabled(),
        environment = %config.tracing.environment,
        "Configuration loaded"
    );

    match kbot::lifecycle::run(config, VERSION).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

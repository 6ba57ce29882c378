//! model-fanout server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────────┐
//!                      │                   MODEL FANOUT                      │
//!                      │                                                     │
//!   POST /query        │  ┌─────────┐    ┌──────────────┐                    │
//!   GET /query/stream ─┼─▶│  http   │───▶│ orchestrator │──┬─▶ limiter ─▶ backend A
//!                      │  │ server  │    │   query_all  │  ├─▶ limiter ─▶ backend B
//!   ranked responses   │  │         │◀───│ (settle-all) │  └─▶ limiter ─▶ backend C
//!   + status events ◀──┼──│         │    └──────┬───────┘        │
//!                      │  └─────────┘           │           retries/backoff
//!                      │                        ▼                             │
//!                      │          config · observability · lifecycle          │
//!                      └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use model_fanout::config::{load_config, FanoutConfig};
use model_fanout::http::HttpServer;
use model_fanout::lifecycle::{signals, Shutdown};
use model_fanout::observability::{logging, metrics};
use model_fanout::orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "model-fanout")]
#[command(about = "Fan a prompt out to rate-limited model backends", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "FANOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => FanoutConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("model-fanout v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?args.config,
        bind_address = %config.server.bind_address,
        backends = config.backends.len(),
        admission_timeout_secs = config.query.admission_timeout_secs,
        max_attempts = config.query.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::listen(shutdown.clone()));

    let server = HttpServer::new(config.server.clone(), orchestrator.clone());
    server.run(listener, shutdown).await?;

    orchestrator.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

//! Service gateway.
//!
//! Forwards any request to the host named in `x-gateway-service-host`,
//! attaching the API credential for that host so callers never hold it.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ gateway::Gateway ──▶ dispatch ──▶ Target host
//!                 (request id,      (directive,          (reqwest)
//!                  trace, limit)     credential, auth)
//!     Client ◀── relay (buffered | event stream) ◀───────────────────┘
//!                       │
//!                       └─▶ analytics (SQLite, detached) ◀── retention job
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use service_gateway::config::{self, validation::validate_config, ConfigError, GatewayConfig};
use service_gateway::lifecycle::{self, signals, Shutdown};
use service_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "Credential-injecting HTTP forwarding gateway", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability);
    tracing::info!("service-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        upstream_scheme = %config.upstream.scheme,
        analytics = config.analytics.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let components = lifecycle::build(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();

    let retention_task = components
        .retention
        .map(|job| tokio::spawn(job.run(shutdown.subscribe())));

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    components.server.run(listener, server_shutdown).await?;

    if let Some(task) = retention_task {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

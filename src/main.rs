//! geoproxy
//!
//! A same-origin forwarding proxy for browser-based GIS clients.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser (page origin)
//!         │  GET /proxy?url=https://maps.example/wms?...
//!         │  GET /geoserver/wms?service=WMS
//!         ▼
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  http::server   request ID, trace, timeout               │
//!  │      │                                                   │
//!  │      ▼                                                   │
//!  │  proxy::mount ──▶ proxy::guard ──▶ proxy::outgoing       │
//!  │                                        │                 │
//!  │                                        ▼                 │
//!  │  http::response ◀──────────────── proxy::exchange ───────┼──▶ Upstream
//!  └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use geoproxy::config::{load_config, ServerConfig};
use geoproxy::lifecycle::{signals, Shutdown};
use geoproxy::observability::{logging, metrics};
use geoproxy::HttpServer;

#[derive(Parser)]
#[command(name = "geoproxy")]
#[command(about = "Same-origin forwarding proxy for browser GIS clients", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!("geoproxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mounts = config.mounts.len(),
        request_timeout_secs = config.timeouts.request_secs,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

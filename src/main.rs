//! Prefix-routed reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ routing ──▶ header policy ──▶ upstream client ──▶ Target
//!                          │             │                               │
//!                          │       ConfigStore ◀── reloader ◀── config file
//!                          │                                             │
//!     Client Response ◀────┴──────────── response relay ◀────────────────┘
//! ```
//!
//! Every request reads one configuration snapshot from the store; the
//! reloader swaps in a new snapshot when the config file changes.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use prefix_proxy::config::{load_from_source, ConfigReloader, ConfigStore, FileSource};
use prefix_proxy::lifecycle::{signals, startup, Shutdown};
use prefix_proxy::observability::{logging, metrics};
use prefix_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "prefix-proxy", version, about = "Prefix-routed hot-reloading reverse proxy")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "PREFIX_PROXY_CONFIG", default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let cli = Cli::parse();

    let source = FileSource::new(&cli.config);
    let (config, marker) = match load_from_source(&source) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(config = %cli.config.display(), "Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    startup::log_startup_summary(&config, &cli.config.display().to_string());

    if let Some(addr) = &config.server.metrics_address {
        metrics::init_metrics(addr.parse()?)?;
    }

    let bind_address = config.server.bind_address();
    let reload_period = config.server.reload_period();
    let store = ConfigStore::new(config);
    let shutdown = Shutdown::new();

    let reloader = reload_period.map(|period| {
        let reloader = ConfigReloader::new(source, store.clone(), period, marker);
        tokio::spawn(reloader.run(shutdown.subscribe()))
    });

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(store);
    let served = server.run(listener, shutdown.subscribe()).await;

    // Stop the reloader whether the server drained or failed.
    shutdown.trigger();
    if let Some(handle) = reloader {
        let _ = handle.await;
    }
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}

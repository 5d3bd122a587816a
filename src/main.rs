//! gemserve: a Gemini protocol server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client (TLS)
//!     ────────────▶ net::listener ─▶ net::server ─▶ net::connection
//!                                                       │
//!                                   protocol::request ◀─┤ read + parse
//!                                   routing::Router   ◀─┤ longest prefix
//!                                   handlers::*       ◀─┤ handle
//!                                   protocol::response◀─┘ commit
//!
//!     Cross-cutting: config, observability, lifecycle (signals, shutdown),
//!     resilience (deadline / cancellation race)
//! ```

use std::path::PathBuf;

use clap::Parser;

use gemserve::config::{load_config, validate_config, ConfigError, RouteConfig, ServerConfig};
use gemserve::lifecycle::signals::spawn_signal_listener;
use gemserve::net::{load_tls_config, Server};
use gemserve::observability::init_logging;
use gemserve::routing::Router;

#[derive(Parser)]
#[command(name = "gemserve")]
#[command(about = "Serve Gemini capsules over TLS", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Serve this directory at `/` in addition to configured routes.
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
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
    if let Some(root) = cli.root {
        config.routes.push(RouteConfig {
            prefix: "/".to_string(),
            root,
        });
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gemserve starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let tls = load_tls_config(&config.tls.cert_path, &config.tls.key_path)?;
    let router = Router::from_config(&config.routes);
    let server = Server::bind(&config, tls, router).await?;

    let _signals = spawn_signal_listener(server.shutdown_handle());
    server.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

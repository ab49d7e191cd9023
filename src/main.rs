//! Ollama-to-OpenAI translating reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 OLLAMA BRIDGE                │
//!   Ollama client        │  ┌────────┐   ┌─────────┐   ┌────────────┐   │
//!   ─────────────────────┼─▶│ server │──▶│ routing │──▶│   proxy    │───┼──▶ OpenAI-compatible
//!   GET  /api/tags       │  │ (axum) │   │  table  │   │   engine   │   │    backend
//!   POST /api/chat       │  └────────┘   └─────────┘   └─────┬──────┘   │    /v1/models
//!                        │                                   │          │    /v1/chat/completions
//!   ◀────────────────────┼──── chunked: streamed through ◀───┤          │
//!   ◀────────────────────┼──── fixed:   transcode / as-is ◀──┘          │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ollama_bridge::config::{read_config, ProxyConfig};
use ollama_bridge::lifecycle::{wait_for_shutdown_signal, Shutdown};
use ollama_bridge::observability::{logging, metrics};
use ollama_bridge::HttpServer;

#[derive(Parser)]
#[command(name = "ollama-bridge")]
#[command(about = "Serve the Ollama API in front of an OpenAI-compatible backend", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8080
    #[arg(short, long)]
    backend: Option<String>,

    /// Listen address, e.g. 0.0.0.0:11434
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        if let Some(backend) = self.backend {
            config.backend.url = backend;
        }
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    logging::init_logging(&config.observability.log_level)?;

    tracing::info!("ollama-bridge v{} starting", env!("CARGO_PKG_VERSION"));

    let server = HttpServer::new(config.clone())?;

    if config.observability.metrics_enabled {
        // Validation already checked the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        backend = %config.backend.url,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signals");
        }
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

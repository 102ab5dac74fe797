//! recd-server: live recording server.
//!
//! Accepts WebSocket connections, lets each client stream a start/stop
//! bracketed sequence of binary audio chunks, and appends them to one file
//! per recording on disk.

mod broadcast;
mod config;
mod recording;
mod server;
mod transport;

use clap::Parser;
use config::ServerConfig;
use server::RecdServer;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// recd-server — live recording server
#[derive(Parser, Debug)]
#[command(name = "recd-server", version, about = "Live recording server")]
struct Cli {
    /// Listen port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Listen address
    #[arg(long)]
    host: Option<IpAddr>,

    /// Config file path
    #[arg(long, default_value = "~/.recd/config.toml")]
    config: String,

    /// Directory recordings are written to
    #[arg(long)]
    recordings_dir: Option<String>,

    /// Maximum concurrent connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::EnvFilter;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting recd-server");

    // Load server config (file + CLI overrides)
    let config_path = PathBuf::from(&cli.config);
    let server_config = match ServerConfig::load(
        Some(&config_path),
        cli.host,
        cli.port,
        cli.recordings_dir.as_deref(),
        cli.max_connections,
    ) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let listen_addr = server_config.listen_addr();
    let listener = match transport::websocket::bind(listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };

    let recd_server = match RecdServer::new(server_config).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to create server");
            std::process::exit(1);
        }
    };

    info!(addr = %listen_addr, "listening");

    // Run until shutdown signal; open recordings are finalized before returning.
    if let Err(e) = recd_server.run(listener, shutdown_signal()).await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }

    info!("recd-server stopped");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, waiting for Ctrl+C only");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

//! Rapantix Server - HTTP backend for the Rapantix guessing game.
//!
//! Hosts the team and versus session engines and the word similarity
//! endpoint. All session state lives in memory and is lost on restart.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rapantix_core::{start_server, AppState, NeighborTable, SimilarityOracle, SystemClock};
use tokio::signal;

use crate::config::ServerConfig;

/// Rapantix Server - multiplayer sessions and word similarity API.
#[derive(Parser, Debug)]
#[command(name = "rapantix-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "RAPANTIX_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "RAPANTIX_BIND_PORT")]
    port: Option<u16>,

    /// Idle session TTL in seconds, <= 0 disables expiry (overrides config file).
    #[arg(long, env = "RAPANTIX_SESSION_TTL_SECS", allow_hyphen_values = true)]
    session_ttl_secs: Option<i64>,

    /// Precomputed neighbour table (JSON) for similarity lookups.
    #[arg(short = 'n', long, value_name = "FILE", env = "RAPANTIX_NEIGHBORS_PATH")]
    neighbors: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Rapantix Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(ttl) = args.session_ttl_secs {
        config.session_ttl_secs = ttl;
    }
    if let Some(path) = args.neighbors {
        config.neighbors_path = Some(path);
    }

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    log::info!(
        "Configuration: bind_port={}, session_ttl_secs={}, max_topn={}",
        config.bind_port,
        config.session_ttl_secs,
        config.max_topn
    );

    let oracle = load_oracle(&config);

    let app_state = AppState::new(core_config, oracle, SystemClock::arc());

    start_server(app_state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    log::info!("Shutdown complete");
    Ok(())
}

/// Loads the neighbour table, falling back to an empty one.
///
/// Sessions do not depend on similarity lookups, so a missing table only
/// degrades `/similar` to empty results.
fn load_oracle(config: &ServerConfig) -> Arc<dyn SimilarityOracle> {
    let Some(path) = config.neighbors_path.as_deref() else {
        log::warn!("No neighbour table configured - /similar will return no results");
        return Arc::new(NeighborTable::empty(config.oracle_name.as_str()));
    };

    match NeighborTable::load(config.oracle_name.as_str(), path) {
        Ok(table) => Arc::new(table),
        Err(e) => {
            log::warn!("{} - /similar will return no results", e);
            Arc::new(NeighborTable::empty(config.oracle_name.as_str()))
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, draining requests...");
}

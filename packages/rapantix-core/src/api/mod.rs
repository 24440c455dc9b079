//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clock::Clock;
use crate::services::{TeamSessions, VersusSessions};
use crate::similarity::SimilarityOracle;
use crate::state::Config;

pub mod http;
pub mod response;

/// Port range scanned when no preferred port is configured.
const PORT_RANGE: (u16, u16) = (49500, 49510);

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All game logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Cooperative sessions.
    pub team: Arc<TeamSessions>,
    /// Competitive sessions.
    pub versus: Arc<VersusSessions>,
    /// Word similarity lookups.
    pub oracle: Arc<dyn SimilarityOracle>,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds both session registries from `config`.
    pub fn new(config: Config, oracle: Arc<dyn SimilarityOracle>, clock: Arc<dyn Clock>) -> Self {
        let ttl = config.session_ttl_secs;
        if ttl <= 0 {
            log::info!("[Server] Session expiry disabled");
        } else {
            log::info!("[Server] Sessions expire after {}s idle", ttl);
        }
        Self {
            team: Arc::new(TeamSessions::new(ttl, clock.clone())),
            versus: Arc::new(VersusSessions::new(ttl, clock)),
            oracle,
            config: Arc::new(config),
        }
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Builds the CORS layer from the configured origins.
fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.cors_allows_any() {
        AllowOrigin::any()
    } else {
        let trusted = config.cors_allowed_origins.clone();
        log::info!("[Server] CORS trusted origins: {:?}", trusted);
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let origin = origin.to_str().unwrap_or("");
            trusted.iter().any(|allowed| origin.starts_with(allowed.as_str()))
        })
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Starts the HTTP server on the configured or auto-discovered port.
///
/// Runs until `shutdown` completes, then drains in-flight requests.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = Arc::clone(&state.config);
    let (port, listener) = if config.preferred_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.preferred_port));
        (
            config.preferred_port,
            tokio::net::TcpListener::bind(&addr).await?,
        )
    } else {
        find_available_port(PORT_RANGE.0, PORT_RANGE.1).await?
    };

    log::info!("[Server] Listening on http://0.0.0.0:{}", port);
    let app = http::create_router(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

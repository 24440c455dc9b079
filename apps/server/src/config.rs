//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = scan the default range).
    /// Override: `RAPANTIX_BIND_PORT`
    pub bind_port: u16,

    /// Idle time after which a session is evicted, in seconds.
    /// Zero or negative disables expiry.
    /// Override: `RAPANTIX_SESSION_TTL_SECS`
    pub session_ttl_secs: i64,

    /// Upper bound for similarity `topn` requests.
    pub max_topn: usize,

    /// Origins allowed by CORS (`"*"` for any).
    pub cors_allowed_origins: Vec<String>,

    /// Precomputed neighbour table (JSON) exported from the embedding model.
    /// Override: `RAPANTIX_NEIGHBORS_PATH`
    pub neighbors_path: Option<PathBuf>,

    /// Name reported as the origin of similarity scores.
    pub oracle_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = rapantix_core::Config::default();
        Self {
            bind_port: 8000,
            session_ttl_secs: core.session_ttl_secs,
            max_topn: core.max_topn,
            cors_allowed_origins: core.cors_allowed_origins,
            neighbors_path: None,
            oracle_name: "word2bezbar".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RAPANTIX_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("RAPANTIX_SESSION_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                self.session_ttl_secs = ttl;
            }
        }

        // Note: RAPANTIX_NEIGHBORS_PATH is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to rapantix-core's Config type.
    pub fn to_core_config(&self) -> rapantix_core::Config {
        rapantix_core::Config {
            preferred_port: self.bind_port,
            session_ttl_secs: self.session_ttl_secs,
            max_topn: self.max_topn,
            cors_allowed_origins: self.cors_allowed_origins.clone(),
        }
    }
}

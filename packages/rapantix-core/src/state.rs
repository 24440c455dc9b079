//! Core application configuration.

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{DEFAULT_SESSION_TTL_SECS, MAX_TOPN};

/// Configuration for the Rapantix server core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP server (0 = scan the default range).
    pub preferred_port: u16,

    /// Origins allowed by CORS. `"*"` allows any origin; other entries
    /// are matched as prefixes of the request's `Origin` header.
    pub cors_allowed_origins: Vec<String>,

    // Sessions
    /// Idle time after which a session is evicted (seconds, <= 0 disables).
    pub session_ttl_secs: i64,

    // Similarity
    /// Upper bound for the `topn` parameter of similarity lookups.
    pub max_topn: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            cors_allowed_origins: vec!["*".to_string()],
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_topn: MAX_TOPN,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_topn == 0 {
            return Err("max_topn must be >= 1".to_string());
        }
        if self.max_topn > MAX_TOPN {
            return Err(format!("max_topn must be <= {MAX_TOPN}"));
        }
        Ok(())
    }

    /// Returns `true` when CORS should accept any origin.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }
}

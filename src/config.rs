//! Server configuration module
//! Handles dynamic configuration parameters for the chat server

use crate::constants::{
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_HANDSHAKE_TIMEOUT_SECS, DEFAULT_HOST,
    DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_PORT,
};
use crate::error::{ParleyError, Result};
use std::env;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for the initial handle negotiation, per read
    pub handshake_timeout: Duration,
    /// Inactivity deadline for an established connection, re-armed on every frame
    pub idle_timeout: Duration,
    /// How often the stale-session sweep runs
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("PARLEY_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("PARLEY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let handshake_secs = env::var("PARLEY_HANDSHAKE_TIMEOUT")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS);

        let idle_secs = env::var("PARLEY_IDLE_TIMEOUT")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS);

        let cleanup_secs = env::var("PARLEY_CLEANUP_INTERVAL")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS);

        if handshake_secs == 0 || idle_secs == 0 {
            return Err(ParleyError::ConfigError(
                "Timeouts must be greater than zero seconds".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            handshake_timeout: Duration::from_secs(handshake_secs),
            idle_timeout: Duration::from_secs(idle_secs),
            cleanup_interval: Duration::from_secs(cleanup_secs),
        })
    }

    /// Full listen address in host:port form
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

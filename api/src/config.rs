//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use shared::config::{CacheConfig, LoggingConfig, TelemetryConfig};
use std::net::SocketAddr;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `CAP_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `CAP_PORT`: The port to listen on (default: 8080)
///
/// Cache, metrics and logging settings are read by their own `from_env`
/// constructors in `shared::config`.
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Cache backend settings.
    pub cache: CacheConfig,
    /// Metric collection settings.
    pub telemetry: TelemetryConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `CAP_PORT` is set but cannot be parsed as a valid port number
    /// - Any cache, telemetry or logging variable is invalid
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("CAP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("CAP_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("CAP_PORT must be a valid port number")?
            .unwrap_or(8080);

        Ok(Self {
            host,
            port,
            cache: CacheConfig::from_env()?,
            telemetry: TelemetryConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cache: CacheConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

//! Configuration module for CAP.
//!
//! This module contains configuration structures for the cache backend, metric
//! collection and logging, each loadable from `CAP_*` environment variables.

pub mod cache;
pub mod telemetry;

pub use cache::{CacheConfig, DEFAULT_REDIS_URL, DEFAULT_TTL_SECS};
pub use telemetry::{LogFormat, LoggingConfig, TelemetryConfig};

use thiserror::Error;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("Invalid value '{value}' for {var}")]
    InvalidValue {
        /// Name of the environment variable.
        var: String,
        /// The rejected value.
        value: String,
    },

    /// The parsed configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Reads an environment variable and parses it, returning `None` when unset.
pub(crate) fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Parses a boolean flag accepting `1/0`, `true/false`, `yes/no`.
pub(crate) fn parse_flag(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Reads a boolean flag from the environment, returning `None` when unset.
pub(crate) fn env_flag(var: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_flag(var, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("X", "1"), Ok(true));
        assert_eq!(parse_flag("X", "TRUE"), Ok(true));
        assert_eq!(parse_flag("X", "no"), Ok(false));
        assert_eq!(parse_flag("X", " off "), Ok(false));
    }

    #[test]
    fn test_parse_flag_rejects_garbage() {
        let err = parse_flag("CAP_USE_REDIS", "maybe").unwrap_err();
        assert_eq!(err.to_string(), "Invalid value 'maybe' for CAP_USE_REDIS");
    }
}

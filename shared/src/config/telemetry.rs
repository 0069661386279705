//! Metrics and logging configuration.

use super::{env_flag, env_parse, ConfigError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Output format of the log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line (production).
    #[default]
    Json,
    /// Coloured, human-readable lines (development).
    Pretty,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Pretty => write!(f, "pretty"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" | "human" => Ok(Self::Pretty),
            other => Err(format!("Unknown log format: '{other}'")),
        }
    }
}

/// Logging configuration.
///
/// - `CAP_LOG_LEVEL`: default filter directive when `RUST_LOG` is unset (default: "info")
/// - `CAP_LOG_FORMAT`: `json` or `pretty`; when unset, JSON unless `CAP_DEVELOPER_MODE=1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level / filter directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Picks the format for the given developer-mode flag.
    ///
    /// ```
    /// use shared::config::{LogFormat, LoggingConfig};
    ///
    /// assert_eq!(LoggingConfig::format_for_mode(true), LogFormat::Pretty);
    /// assert_eq!(LoggingConfig::format_for_mode(false), LogFormat::Json);
    /// ```
    #[must_use]
    pub fn format_for_mode(developer_mode: bool) -> LogFormat {
        if developer_mode {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }

    /// Loads the configuration from `CAP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `CAP_LOG_FORMAT` or `CAP_DEVELOPER_MODE` hold
    /// unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let level = std::env::var("CAP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match std::env::var("CAP_LOG_FORMAT") {
            Ok(raw) => raw.parse::<LogFormat>().map_err(|_| ConfigError::InvalidValue {
                var: "CAP_LOG_FORMAT".to_string(),
                value: raw,
            })?,
            Err(_) => Self::format_for_mode(env_flag("CAP_DEVELOPER_MODE")?.unwrap_or(false)),
        };
        Ok(Self { level, format })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Metric collection configuration.
///
/// - `CAP_METRICS_PREFIX`: prefix prepended to every metric name (default: "cap")
/// - `CAP_METRICS_FLUSH_THRESHOLD`: buffered samples before an automatic flush (default: 100)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Metric name prefix.
    pub metrics_prefix: String,
    /// Buffer size that triggers a flush.
    pub flush_threshold: usize,
}

impl TelemetryConfig {
    /// Loads the configuration from `CAP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is unparsable or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            metrics_prefix: std::env::var("CAP_METRICS_PREFIX")
                .unwrap_or(defaults.metrics_prefix),
            flush_threshold: env_parse("CAP_METRICS_FLUSH_THRESHOLD")?
                .unwrap_or(defaults.flush_threshold),
        };
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is empty or the threshold is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.metrics_prefix.trim().is_empty() {
            return Err("Metrics prefix cannot be empty".to_string());
        }
        if self.flush_threshold == 0 {
            return Err("Flush threshold must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_prefix: "cap".to_string(),
            flush_threshold: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_format_serialization() {
        let json = serde_json::to_string(&LogFormat::Pretty).unwrap();
        assert_eq!(json, "\"pretty\"");
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.metrics_prefix, "cap");
        assert_eq!(config.flush_threshold, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_telemetry_config_validate() {
        let empty_prefix = TelemetryConfig {
            metrics_prefix: String::new(),
            ..TelemetryConfig::default()
        };
        assert_eq!(
            empty_prefix.validate().unwrap_err(),
            "Metrics prefix cannot be empty"
        );

        let zero = TelemetryConfig {
            flush_threshold: 0,
            ..TelemetryConfig::default()
        };
        assert!(zero.validate().is_err());
    }
}

//! Cache backend configuration.
//!
//! Controls which backend the cache manager prefers and the default
//! time-to-live applied to entries written without an explicit TTL.

use super::{env_flag, env_parse, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Redis URL used when none is configured.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Default time-to-live for cache entries, in seconds (5 minutes).
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Configuration for the cache manager.
///
/// Configuration values can be set via environment variables:
/// - `CAP_USE_REDIS`: Prefer the Redis backend (default: true)
/// - `CAP_REDIS_URL`: Redis connection URL (default: `redis://127.0.0.1:6379/0`)
/// - `CAP_CACHE_DEFAULT_TTL`: Default TTL in seconds (default: 300)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Try Redis first; fall back to the in-process store when unreachable.
    pub use_redis: bool,
    /// Redis connection URL.
    pub redis_url: String,
    /// TTL applied when a write does not specify one, in seconds.
    pub default_ttl_secs: u64,
}

impl CacheConfig {
    /// Creates a configuration that never attempts to reach Redis.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::CacheConfig;
    ///
    /// let config = CacheConfig::local();
    /// assert!(!config.use_redis);
    /// assert_eq!(config.default_ttl_secs, 300);
    /// ```
    #[must_use]
    pub fn local() -> Self {
        Self {
            use_redis: false,
            ..Self::default()
        }
    }

    /// Creates a configuration pointing at the given Redis URL.
    #[must_use]
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            use_redis: true,
            redis_url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the default TTL.
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs();
        self
    }

    /// Returns the default TTL as a `Duration`.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Loads the configuration from `CAP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            use_redis: env_flag("CAP_USE_REDIS")?.unwrap_or(defaults.use_redis),
            redis_url: std::env::var("CAP_REDIS_URL").unwrap_or(defaults.redis_url),
            default_ttl_secs: env_parse("CAP_CACHE_DEFAULT_TTL")?
                .unwrap_or(defaults.default_ttl_secs),
        };
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default TTL is zero
    /// - Redis is enabled with an empty URL
    pub fn validate(&self) -> Result<(), String> {
        if self.default_ttl_secs == 0 {
            return Err("Default TTL must be greater than zero".to_string());
        }
        if self.use_redis && self.redis_url.trim().is_empty() {
            return Err("Redis URL cannot be empty when Redis is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_redis: true,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            default_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert!(config.use_redis);
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_cache_config_with_default_ttl() {
        let config = CacheConfig::local().with_default_ttl(Duration::from_secs(60));
        assert_eq!(config.default_ttl_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_validate_zero_ttl() {
        let config = CacheConfig::local().with_default_ttl(Duration::ZERO);
        assert_eq!(
            config.validate().unwrap_err(),
            "Default TTL must be greater than zero"
        );
    }

    #[test]
    fn test_cache_config_validate_empty_url() {
        let config = CacheConfig::redis("  ");
        assert!(config.validate().is_err());

        let local = CacheConfig {
            redis_url: String::new(),
            ..CacheConfig::local()
        };
        assert!(local.validate().is_ok());
    }

    #[test]
    fn test_cache_config_serialization() {
        let config = CacheConfig::redis("redis://cache:6379/1");
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}

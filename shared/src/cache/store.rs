//! Cache backend trait.
//!
//! Provides the `CacheStore` trait implemented by the Redis and in-process
//! backends. Every operation is fallible; the best-effort policy lives in
//! [`CacheManager`](super::CacheManager), not here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend rejected the command or could not be reached.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Increment on a key whose value is not an integer.
    #[error("Value at '{0}' is not an integer")]
    NotAnInteger(String),

    /// Increment would overflow a signed 64-bit integer.
    #[error("Increment on '{0}' would overflow")]
    Overflow(String),

    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on cache store")]
    LockError,
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Which backend is serving a cache manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// External Redis server.
    Redis,
    /// In-process store.
    Local,
}

impl std::fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Trait for cache backend implementations.
///
/// Values are JSON documents. Implementations must be thread-safe (Send + Sync).
pub trait CacheStore: Send + Sync {
    /// Returns the backend kind.
    fn kind(&self) -> CacheBackendKind;

    /// Returns true if [`delete_pattern`](Self::delete_pattern) expands wildcards.
    fn supports_patterns(&self) -> bool;

    /// Fetches the value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Stores `value` at `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`, returning true if it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every key matching `pattern`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Returns true if `key` holds an unexpired value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Adds `amount` to the integer at `key` (missing keys start at 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an integer, the addition
    /// overflows, or the backend operation fails.
    fn increment(&self, key: &str, amount: i64) -> Result<i64, CacheError>;

    /// Removes every key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    fn flush(&self) -> Result<(), CacheError>;
}

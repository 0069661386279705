//! Cache manager.
//!
//! Uniform get/set/delete/increment interface over the Redis and in-process
//! stores. Each operation comes in two flavours:
//!
//! - `try_*` returns a `Result`, so callers can tell "absent" from "backend failed".
//! - The plain form is best-effort: failures are logged and mapped to a safe
//!   default (`None`, `false`, `0`).

use super::local::LocalStore;
use super::redis_store::RedisStore;
use super::store::{CacheBackendKind, CacheError, CacheStore};
use crate::config::CacheConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Unified cache manager.
///
/// Cloning is cheap; clones share the same backend.
///
/// # Example
///
/// ```
/// use shared::cache::CacheManager;
///
/// let cache = CacheManager::local();
/// assert_eq!(cache.get_or("missing", "fallback".to_string()), "fallback");
///
/// cache.set("greeting", &"hello", None);
/// assert_eq!(cache.get::<String>("greeting").as_deref(), Some("hello"));
/// ```
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("backend", &self.store.kind())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl CacheManager {
    /// Creates a cache manager from configuration.
    ///
    /// When Redis is preferred but cannot be reached, this logs a warning and
    /// falls back to the in-process store.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let store: Arc<dyn CacheStore> = if config.use_redis {
            match RedisStore::connect(&config.redis_url) {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    tracing::warn!(
                        component = "cache_manager",
                        url = %config.redis_url,
                        error = %e,
                        "Redis initialization failed, using local cache"
                    );
                    Arc::new(LocalStore::new())
                }
            }
        } else {
            Arc::new(LocalStore::new())
        };

        Self {
            store,
            default_ttl: config.default_ttl(),
        }
    }

    /// Creates a cache manager over a fresh in-process store.
    #[must_use]
    pub fn local() -> Self {
        Self::new(&CacheConfig::local())
    }

    /// Creates a cache manager over the given store.
    #[must_use]
    pub fn with_store(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Returns the active backend.
    #[must_use]
    pub fn backend(&self) -> CacheBackendKind {
        self.store.kind()
    }

    /// Returns true if `delete_pattern` expands wildcards on this backend.
    #[must_use]
    pub fn supports_patterns(&self) -> bool {
        self.store.supports_patterns()
    }

    /// Returns the TTL used when a write does not specify one.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // ---------------------------------------------------------------------
    // Explicit-result operations
    // ---------------------------------------------------------------------

    /// Fetches and deserializes the value at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the stored value does not
    /// deserialize into `T`.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Fetches the raw JSON value at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn try_get_value(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.store.get(key)
    }

    /// Serializes and stores `value` at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend fails.
    pub fn try_set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        self.store
            .set(key, value, ttl.unwrap_or(self.default_ttl))
    }

    /// Removes `key`, returning true if it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn try_delete(&self, key: &str) -> Result<bool, CacheError> {
        self.store.delete(key)
    }

    /// Removes keys matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn try_delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.store.delete_pattern(pattern)
    }

    /// Returns true if `key` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn try_exists(&self, key: &str) -> Result<bool, CacheError> {
        self.store.exists(key)
    }

    /// Adds `amount` to the integer at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an integer or the backend fails.
    pub fn try_increment(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        self.store.increment(key, amount)
    }

    /// Subtracts `amount` from the integer at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Overflow`] if `amount` cannot be negated, and
    /// otherwise the same errors as [`try_increment`](Self::try_increment).
    pub fn try_decrement(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        let delta = amount
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        self.try_increment(key, delta)
    }

    /// Removes every key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn try_flush(&self) -> Result<(), CacheError> {
        self.store.flush()
    }

    // ---------------------------------------------------------------------
    // Best-effort operations
    // ---------------------------------------------------------------------

    /// Returns the value at `key`, or `None` if absent or on failure.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_get(key)
            .unwrap_or_else(|e| log_failure("get", key, &e, None))
    }

    /// Returns the value at `key`, or `default` if absent or on failure.
    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Stores `value` at `key`; `None` uses the default TTL.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        self.try_set(key, value, ttl)
            .map(|()| true)
            .unwrap_or_else(|e| log_failure("set", key, &e, false))
    }

    /// Deletes `key`. Returns true when the backend accepted the delete,
    /// whether or not the key existed.
    pub fn delete(&self, key: &str) -> bool {
        self.try_delete(key)
            .map(|_| true)
            .unwrap_or_else(|e| log_failure("delete", key, &e, false))
    }

    /// Deletes keys matching `pattern` and returns how many were removed.
    ///
    /// On the local backend only a key literally equal to `pattern` is removed.
    pub fn delete_pattern(&self, pattern: &str) -> u64 {
        if !self.supports_patterns() && is_wildcard(pattern) {
            tracing::debug!(
                component = "cache_manager",
                pattern = %pattern,
                "Local cache cannot expand patterns; removing literal key only"
            );
        }
        self.try_delete_pattern(pattern)
            .unwrap_or_else(|e| log_failure("delete_pattern", pattern, &e, 0))
    }

    /// Returns true if `key` exists; false if absent or on failure.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.try_exists(key)
            .unwrap_or_else(|e| log_failure("exists", key, &e, false))
    }

    /// Increments the integer at `key` and returns the new value (0 on failure).
    pub fn increment(&self, key: &str, amount: i64) -> i64 {
        self.try_increment(key, amount)
            .unwrap_or_else(|e| log_failure("increment", key, &e, 0))
    }

    /// Decrements the integer at `key` and returns the new value (0 on failure).
    pub fn decrement(&self, key: &str, amount: i64) -> i64 {
        self.try_decrement(key, amount)
            .unwrap_or_else(|e| log_failure("decrement", key, &e, 0))
    }

    /// Fetches several keys. Absent keys (and stored nulls) are omitted.
    #[must_use]
    pub fn get_many<S: AsRef<str>>(&self, keys: &[S]) -> HashMap<String, Value> {
        keys.iter()
            .filter_map(|key| {
                let key = key.as_ref();
                match self.try_get_value(key) {
                    Ok(Some(value)) if !value.is_null() => Some((key.to_string(), value)),
                    Ok(_) => None,
                    Err(e) => log_failure("get_many", key, &e, None),
                }
            })
            .collect()
    }

    /// Stores every pair in `mapping`. Returns false if any write failed.
    pub fn set_many<K, V, I>(&self, mapping: I, ttl: Option<Duration>) -> bool
    where
        K: AsRef<str>,
        V: Serialize,
        I: IntoIterator<Item = (K, V)>,
    {
        mapping
            .into_iter()
            .fold(true, |ok, (k, v)| self.set(k.as_ref(), &v, ttl) && ok)
    }

    /// Clears the whole cache.
    pub fn flush(&self) -> bool {
        self.try_flush()
            .map(|()| true)
            .unwrap_or_else(|e| log_failure("flush", "*", &e, false))
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn log_failure<T>(op: &str, key: &str, err: &CacheError, fallback: T) -> T {
    tracing::warn!(
        component = "cache_manager",
        op = op,
        key = %key,
        error = %err,
        "Cache {op} error"
    );
    fallback
}

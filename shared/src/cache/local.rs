//! In-process cache store.
//!
//! Used when Redis is disabled or unreachable. It exposes the same surface as
//! the Redis store with one capability gap: `delete_pattern` never expands
//! wildcards and only removes a key literally named like the pattern.
//!
//! Expired entries are dropped when read and swept from the whole map every
//! [`PURGE_INTERVAL`] writes, so keys that are never read again are still
//! reclaimed.

use super::store::{CacheBackendKind, CacheError, CacheStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Number of writes between full sweeps of expired entries.
pub const PURGE_INTERVAL: u64 = 256;

#[derive(Debug, Clone)]
struct LocalEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl LocalEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory cache store with lazy TTL expiry.
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: RwLock<HashMap<String, LocalEntry>>,
    writes: AtomicU64,
}

impl LocalStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of unexpired entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::LockError)?;
        let now = Instant::now();
        Ok(entries.values().filter(|e| !e.is_expired(now)).count())
    }

    /// Returns true if the store holds no unexpired entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Drops every expired entry, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockError)?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        Ok(before - entries.len())
    }
}

impl CacheStore for LocalStore {
    fn kind(&self) -> CacheBackendKind {
        CacheBackendKind::Local
    }

    fn supports_patterns(&self) -> bool {
        false
    }

    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        {
            let entries = self.entries.read().map_err(|_| CacheError::LockError)?;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    return Ok(Some(entry.value.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it so the map does not grow unbounded.
        let mut entries = self.entries.write().map_err(|_| CacheError::LockError)?;
        if entries
            .get(key)
            .is_some_and(|e| e.is_expired(Instant::now()))
        {
            entries.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockError)?;
        let now = Instant::now();

        if ttl.is_zero() {
            // Expired on arrival, same as the Redis store.
            entries.remove(key);
        } else {
            entries.insert(
                key.to_string(),
                LocalEntry {
                    value,
                    expires_at: now.checked_add(ttl),
                },
            );
        }

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % PURGE_INTERVAL == 0 {
            entries.retain(|_, e| !e.is_expired(now));
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockError)?;
        Ok(entries
            .remove(key)
            .is_some_and(|e| !e.is_expired(Instant::now())))
    }

    fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        // Literal match only; wildcards are not expanded.
        Ok(u64::from(self.delete(pattern)?))
    }

    fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }

    fn increment(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockError)?;
        let now = Instant::now();

        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let current = entry
                    .value
                    .as_i64()
                    .ok_or_else(|| CacheError::NotAnInteger(key.to_string()))?;
                (current, entry.expires_at)
            }
            _ => (0, None),
        };

        let next = current
            .checked_add(amount)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;

        entries.insert(
            key.to_string(),
            LocalEntry {
                value: Value::from(next),
                expires_at,
            },
        );
        Ok(next)
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockError)?;
        entries.clear();
        Ok(())
    }
}

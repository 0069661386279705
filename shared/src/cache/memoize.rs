//! Function-result memoization on top of [`CacheManager`].
//!
//! Keys have the form `"{prefix}:{function}:{hash}"` where `hash` is the first
//! 8 hex characters of the SHA-256 digest of the arguments' canonical JSON
//! (object keys sorted). Eight hex characters is only 32 bits: distinct
//! argument sets collide with birthday-bound probability.

use super::manager::CacheManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "cache";

/// Default memoization TTL (5 minutes).
pub const DEFAULT_MEMO_TTL: Duration = Duration::from_secs(300);

const HASH_LEN: usize = 8;

/// Builds the cache key for a call of `function` with `args`.
///
/// ```
/// use serde_json::json;
/// use shared::cache::cache_key;
///
/// let a = cache_key("tenants::get", &json!({"b": 1, "a": 2}), None);
/// let b = cache_key("tenants::get", &json!({"a": 2, "b": 1}), None);
/// assert_eq!(a, b);
/// assert!(a.starts_with("cache:tenants::get:"));
/// assert_eq!(a.rsplit(':').next().unwrap().len(), 8);
/// ```
#[must_use]
pub fn cache_key<A: Serialize + ?Sized>(function: &str, args: &A, prefix: Option<&str>) -> String {
    let prefix = prefix.unwrap_or(DEFAULT_KEY_PREFIX);
    format!("{prefix}:{function}:{}", args_digest(args))
}

/// Canonical JSON of the arguments. `serde_json::Value` keeps object keys
/// in sorted order, so map and struct arguments serialize deterministically.
fn canonical_json<A: Serialize + ?Sized>(args: &A) -> String {
    serde_json::to_value(args).map_or_else(|_| "null".to_string(), |v| v.to_string())
}

fn args_digest<A: Serialize + ?Sized>(args: &A) -> String {
    let digest = Sha256::digest(canonical_json(args).as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    hex
}

/// A memoized call site.
///
/// # Example
///
/// ```
/// use shared::cache::{CacheManager, Memoized};
/// use std::cell::Cell;
///
/// let cache = CacheManager::local();
/// let calls = Cell::new(0);
/// let lookup = Memoized::new(&cache, "users::roles").key_prefix("user");
///
/// let expensive = |id: u32| {
///     calls.set(calls.get() + 1);
///     vec![format!("role-{id}")]
/// };
///
/// let first: Vec<String> = lookup.call(&(7,), || expensive(7));
/// let second: Vec<String> = lookup.call(&(7,), || expensive(7));
///
/// assert_eq!(first, second);
/// assert_eq!(calls.get(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Memoized<'a> {
    cache: &'a CacheManager,
    function: String,
    ttl: Duration,
    prefix: Option<String>,
}

impl<'a> Memoized<'a> {
    /// Creates a memoized call site for `function` (a fully qualified name).
    #[must_use]
    pub fn new(cache: &'a CacheManager, function: impl Into<String>) -> Self {
        Self {
            cache,
            function: function.into(),
            ttl: DEFAULT_MEMO_TTL,
            prefix: None,
        }
    }

    /// Sets the TTL of stored results.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the key prefix (defaults to `"cache"`).
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Returns the cache key used for `args`.
    #[must_use]
    pub fn key_for<A: Serialize + ?Sized>(&self, args: &A) -> String {
        cache_key(&self.function, args, self.prefix.as_deref())
    }

    /// Returns the cached result for `args`, or runs `f` and caches its result.
    pub fn call<A, T, F>(&self, args: &A, f: F) -> T
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let key = self.key_for(args);
        if let Some(hit) = self.lookup(&key) {
            return hit;
        }

        let value = f();
        self.cache.set(&key, &value, Some(self.ttl));
        value
    }

    /// Like [`call`](Self::call) for fallible functions; only `Ok` results
    /// are cached.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f` unchanged.
    pub fn try_call<A, T, E, F>(&self, args: &A, f: F) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        let key = self.key_for(args);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        let value = f()?;
        self.cache.set(&key, &value, Some(self.ttl));
        Ok(value)
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.try_get::<T>(key) {
            Ok(Some(hit)) => {
                tracing::trace!(key = %key, "memoized hit");
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    component = "memoize",
                    key = %key,
                    error = %e,
                    "Ignoring unreadable memoized value"
                );
                None
            }
        }
    }
}

/// Runs `f`, then deletes cache entries matching `pattern` whatever `f` returned.
///
/// ```
/// use shared::cache::{invalidate_after, CacheManager};
///
/// let cache = CacheManager::local();
/// cache.set("tenant:acme", &"stale", None);
///
/// let result: Result<(), String> = invalidate_after(&cache, "tenant:acme", || {
///     Err("update failed".to_string())
/// });
///
/// assert!(result.is_err());
/// assert!(!cache.exists("tenant:acme"));
/// ```
pub fn invalidate_after<R>(cache: &CacheManager, pattern: &str, f: impl FnOnce() -> R) -> R {
    let result = f();
    let removed = cache.delete_pattern(pattern);
    tracing::debug!(pattern = %pattern, removed, "Invalidated cache after call");
    result
}

/// Creates a [`Memoized`] named after the calling module and the given identifier.
///
/// ```
/// use shared::cache::CacheManager;
/// use shared::memoized;
///
/// let cache = CacheManager::local();
/// let m = memoized!(&cache, tenant_stats);
/// assert!(m.key_for(&("acme",)).contains("::tenant_stats:"));
/// ```
#[macro_export]
macro_rules! memoized {
    ($cache:expr, $name:ident) => {
        $crate::cache::Memoized::new($cache, concat!(module_path!(), "::", stringify!($name)))
    };
}

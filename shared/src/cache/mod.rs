//! Caching layer.
//!
//! [`CacheManager`] prefers Redis and falls back to an in-process store when
//! Redis is disabled or unreachable. [`Memoized`] and [`invalidate_after`]
//! wrap function calls with result caching and invalidation.

pub mod local;
pub mod manager;
pub mod memoize;
pub mod redis_store;
pub mod store;

pub use local::LocalStore;
pub use manager::CacheManager;
pub use memoize::{cache_key, invalidate_after, Memoized, DEFAULT_KEY_PREFIX, DEFAULT_MEMO_TTL};
pub use redis_store::RedisStore;
pub use store::{CacheBackendKind, CacheError, CacheStore};

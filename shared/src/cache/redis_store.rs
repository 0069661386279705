//! Redis cache store.
//!
//! Values are stored as JSON text with `PSETEX`; counters use `INCRBY` so they
//! stay plain integers that read back as JSON numbers.
//!
//! The store holds one connection and re-dials it lazily. A command that
//! fails with an I/O, timeout or dropped-connection error discards the socket,
//! and the next command connects again. Failed commands are not retried, so
//! an `INCRBY` whose reply was lost is never applied twice.

use super::store::{CacheBackendKind, CacheError, CacheStore};
use redis::{Commands, RedisError, RedisResult};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

/// Time allowed to establish a connection and answer `PING`.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Socket read and write timeout for every command.
const IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Cache store backed by a lazily re-established Redis connection.
pub struct RedisStore {
    client: redis::Client,
    conn: Mutex<Option<redis::Connection>>,
    url: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").field("url", &self.url).finish()
    }
}

impl RedisStore {
    /// Opens a connection to `url` and verifies it with `PING`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the server cannot be reached
    /// within the connect timeout, or `PING` fails.
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = dial(&client)?;

        tracing::debug!(url = %url, "Connected to Redis cache");

        Ok(Self {
            client,
            conn: Mutex::new(Some(conn)),
            url: url.to_string(),
        })
    }

    /// Returns the URL this store is connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs `op` on the connection, dialing first if the previous one was
    /// discarded. The outer error covers locking and dialing; the inner
    /// result is the command's own reply.
    fn execute<T>(
        &self,
        op: impl FnOnce(&mut redis::Connection) -> RedisResult<T>,
    ) -> Result<RedisResult<T>, CacheError> {
        let mut slot = self.conn.lock().map_err(|_| CacheError::LockError)?;

        if slot.is_none() {
            let conn = dial(&self.client)?;
            tracing::info!(url = %self.url, "Reconnected to Redis cache");
            *slot = Some(conn);
        }
        let Some(conn) = slot.as_mut() else {
            return Err(CacheError::Backend("Redis connection unavailable".to_string()));
        };

        let result = op(conn);
        if let Err(e) = &result {
            if is_connection_failure(e) {
                tracing::warn!(url = %self.url, error = %e, "Dropping broken Redis connection");
                *slot = None;
            }
        }
        Ok(result)
    }

    fn with_conn<T>(
        &self,
        op: impl FnOnce(&mut redis::Connection) -> RedisResult<T>,
    ) -> Result<T, CacheError> {
        Ok(self.execute(op)??)
    }
}

/// Opens a connection with socket timeouts set and checks it with `PING`.
fn dial(client: &redis::Client) -> RedisResult<redis::Connection> {
    let mut conn = client.get_connection_with_timeout(CONNECT_TIMEOUT)?;
    conn.set_read_timeout(Some(IO_TIMEOUT))?;
    conn.set_write_timeout(Some(IO_TIMEOUT))?;
    redis::cmd("PING").query::<String>(&mut conn)?;
    Ok(conn)
}

/// Errors after which the socket can no longer be trusted.
fn is_connection_failure(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
}

/// Maps the server's `INCRBY` refusals onto the typed cache errors.
fn map_increment_error(key: &str, err: RedisError) -> CacheError {
    let detail = err.detail().unwrap_or_default();
    if detail.contains("not an integer") {
        CacheError::NotAnInteger(key.to_string())
    } else if detail.contains("overflow") {
        CacheError::Overflow(key.to_string())
    } else {
        err.into()
    }
}

/// Decodes a stored payload. Values written by other clients that are not
/// JSON come back as strings.
fn decode(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

/// Expiry in milliseconds for `PSETEX`, or `None` when the entry should
/// expire at once. Sub-millisecond TTLs round up.
fn ttl_millis(ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        return None;
    }
    Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1))
}

impl CacheStore for RedisStore {
    fn kind(&self) -> CacheBackendKind {
        CacheBackendKind::Redis
    }

    fn supports_patterns(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let raw: Option<String> = self.with_conn(|c| c.get(key))?;
        Ok(raw.map(decode))
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(&value)?;
        match ttl_millis(ttl) {
            Some(millis) => self.with_conn(|c| c.pset_ex::<_, _, ()>(key, payload, millis)),
            // An already-expired entry: drop whatever was there.
            None => self.with_conn(|c| c.del::<_, ()>(key)),
        }
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed: u64 = self.with_conn(|c| c.del(key))?;
        Ok(removed > 0)
    }

    fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.with_conn(|c| {
            let keys: Vec<String> = c.keys(pattern)?;
            if keys.is_empty() {
                return Ok(0);
            }
            c.del(keys)
        })
    }

    fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.with_conn(|c| c.exists(key))
    }

    fn increment(&self, key: &str, amount: i64) -> Result<i64, CacheError> {
        self.execute(|c| c.incr(key, amount))?
            .map_err(|e| map_increment_error(key, e))
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.with_conn(|c| redis::cmd("FLUSHDB").query::<()>(c))
    }
}

//! Shared service plumbing.
//!
//! [`BaseService`] bundles the logger, metrics collector and cache handle
//! every domain service needs, and wraps operations with timing and outcome
//! metrics.

use crate::cache::CacheManager;
use crate::config::TelemetryConfig;
use crate::context::RequestContext;
use crate::observability::{MetricsCollector, ServiceLogger};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Composition root for a domain service.
///
/// # Example
///
/// ```
/// use shared::cache::CacheManager;
/// use shared::config::TelemetryConfig;
/// use shared::service::BaseService;
///
/// let service = BaseService::new("BillingService", CacheManager::local(), &TelemetryConfig::default());
///
/// let total: Result<u32, String> = service.execute_with_metrics("invoice.total", || Ok(42));
/// assert_eq!(total, Ok(42));
/// ```
#[derive(Debug)]
pub struct BaseService {
    name: String,
    logger: ServiceLogger,
    metrics: MetricsCollector,
    cache: CacheManager,
}

impl BaseService {
    /// Creates a service named `name` with a metrics collector built from
    /// `telemetry`.
    #[must_use]
    pub fn new(name: impl Into<String>, cache: CacheManager, telemetry: &TelemetryConfig) -> Self {
        let name = name.into();
        Self {
            logger: ServiceLogger::new(name.clone()),
            metrics: MetricsCollector::from_config(telemetry),
            cache,
            name,
        }
    }

    /// Creates a service from prebuilt parts.
    #[must_use]
    pub fn from_parts(
        name: impl Into<String>,
        logger: ServiceLogger,
        metrics: MetricsCollector,
        cache: CacheManager,
    ) -> Self {
        Self {
            name: name.into(),
            logger,
            metrics,
            cache,
        }
    }

    /// Adds request context fields to the logger.
    #[must_use]
    pub fn with_request_context(mut self, ctx: &RequestContext) -> Self {
        self.logger = self.logger.with_request_context(ctx);
        self
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the logger.
    #[must_use]
    pub fn logger(&self) -> &ServiceLogger {
        &self.logger
    }

    /// Returns the metrics collector.
    #[must_use]
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Returns the cache.
    #[must_use]
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Logs `Operation: {operation}` at info level with `fields`.
    pub fn log_operation(&self, operation: &str, fields: Value) {
        self.logger.info(&format!("Operation: {operation}"), fields);
    }

    /// Records a counter sample.
    pub fn record_metric(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        self.metrics.counter(name, value, tags);
    }

    /// Reads a cached value.
    #[must_use]
    pub fn get_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.cache.get(key)
    }

    /// Stores a value; `None` uses the cache's default TTL.
    pub fn set_cached<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        self.cache.set(key, value, ttl)
    }

    /// Deletes entries matching `pattern` and returns how many were removed.
    ///
    /// The pattern is a glob on Redis. Use [`invalidate_key`](Self::invalidate_key)
    /// for keys built from user input.
    pub fn invalidate_cache(&self, pattern: &str) -> u64 {
        self.cache.delete_pattern(pattern)
    }

    /// Deletes exactly `key`. Returns true if it was present.
    pub fn invalidate_key(&self, key: &str) -> bool {
        self.cache.delete(key)
    }

    /// Runs `f`, recording `{operation}.duration` (timer) and
    /// `{operation}.count` (counter), both tagged with `status`.
    ///
    /// A panic in `f` is recorded as `status=error`, `error_type=panic` and
    /// then resumed.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f` unchanged, after logging it.
    pub fn execute_with_metrics<T, E, F>(&self, operation: &str, f: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(f));
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let tags = [("status", "error"), ("error_type", "panic")];
                self.metrics
                    .timer(&format!("{operation}.duration"), elapsed, &tags);
                self.metrics
                    .counter(&format!("{operation}.count"), 1.0, &tags);
                self.logger.error(
                    &format!("Operation panicked: {operation}"),
                    json!({ "duration": elapsed.as_secs_f64() }),
                );
                resume_unwind(payload);
            }
        };

        let status = if result.is_ok() { "success" } else { "error" };
        self.metrics
            .timer(&format!("{operation}.duration"), elapsed, &[("status", status)]);
        self.metrics
            .counter(&format!("{operation}.count"), 1.0, &[("status", status)]);

        if let Err(e) = &result {
            self.logger.error(
                &format!("Operation failed: {operation}"),
                json!({
                    "error": e.to_string(),
                    "duration": elapsed.as_secs_f64(),
                }),
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;
    use crate::observability::InMemorySink;
    use std::sync::Arc;

    fn service() -> (BaseService, Arc<InMemorySink>) {
        let sink = Arc::new(InMemorySink::new());
        let metrics = MetricsCollector::new("cap").with_sink(sink.clone());
        let service = BaseService::from_parts(
            "TestService",
            ServiceLogger::new("TestService"),
            metrics,
            CacheManager::local(),
        );
        (service, sink)
    }

    #[test]
    fn test_execute_with_metrics_success() {
        let (service, sink) = service();

        let result: Result<&str, String> = service.execute_with_metrics("tenant.create", || Ok("done"));
        assert_eq!(result, Ok("done"));
        service.metrics().flush();

        let duration = &sink.named("cap.tenant.create.duration")[0];
        assert_eq!(duration.kind, MetricKind::Timer);
        assert_eq!(duration.tags["status"], "success");

        let count = &sink.named("cap.tenant.create.count")[0];
        assert_eq!(count.kind, MetricKind::Counter);
        assert!((count.value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_execute_with_metrics_returns_original_error() {
        #[derive(Debug, PartialEq)]
        struct QuotaExceeded(u32);

        impl Display for QuotaExceeded {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "quota exceeded by {}", self.0)
            }
        }

        let (service, sink) = service();

        let result: Result<(), QuotaExceeded> =
            service.execute_with_metrics("upload", || Err(QuotaExceeded(3)));
        assert_eq!(result, Err(QuotaExceeded(3)));
        service.metrics().flush();

        assert_eq!(sink.named("cap.upload.duration")[0].tags["status"], "error");
        assert_eq!(sink.named("cap.upload.count")[0].tags["status"], "error");
    }

    #[test]
    fn test_execute_with_metrics_records_panic() {
        let (service, sink) = service();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), String> =
                service.execute_with_metrics("import", || panic!("corrupt row"));
        }));
        assert!(outcome.is_err());
        service.metrics().flush();

        for name in ["cap.import.duration", "cap.import.count"] {
            let sample = &sink.named(name)[0];
            assert_eq!(sample.tags["status"], "error");
            assert_eq!(sample.tags["error_type"], "panic");
        }
    }

    #[test]
    fn test_cache_helpers() {
        let (service, _) = service();

        assert!(service.set_cached("tenant:acme", &"Acme", None));
        assert_eq!(service.get_cached::<String>("tenant:acme").as_deref(), Some("Acme"));
        assert_eq!(service.invalidate_cache("tenant:acme"), 1);
        assert!(service.get_cached::<String>("tenant:acme").is_none());

        assert!(service.set_cached("tenant:a[1]", &"A1", None));
        assert!(service.invalidate_key("tenant:a[1]"));
        assert!(!service.invalidate_key("tenant:a[1]"));
    }

    #[test]
    fn test_record_metric_is_counter() {
        let (service, sink) = service();
        service.record_metric("tenant.login", 2.0, &[("tenant", "acme")]);
        service.log_operation("tenant_login", json!({"tenant": "acme"}));
        service.metrics().flush();

        let sample = &sink.named("cap.tenant.login")[0];
        assert_eq!(sample.kind, MetricKind::Counter);
        assert_eq!(sample.tags["tenant"], "acme");
    }

    #[test]
    fn test_new_uses_telemetry_prefix() {
        let telemetry = TelemetryConfig {
            metrics_prefix: "civic".to_string(),
            flush_threshold: 10,
        };
        let service = BaseService::new("Svc", CacheManager::local(), &telemetry);
        assert_eq!(service.name(), "Svc");
        assert_eq!(service.metrics().prefix(), "civic");
        assert_eq!(service.logger().component(), "Svc");
    }
}

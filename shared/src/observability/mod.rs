//! Observability stack.
//!
//! Provides structured logging, buffered metric collection and manual span
//! tracing.
//!
//! ```
//! use shared::observability::{InMemorySink, MetricsCollector, Tracer};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(InMemorySink::new());
//! let metrics = MetricsCollector::new("cap").with_sink(sink.clone());
//! metrics.counter("api.request", 1.0, &[("method", "GET")]);
//! metrics.flush();
//! assert_eq!(sink.len(), 1);
//!
//! let tracer = Tracer::new();
//! {
//!     let _span = tracer.span("database_query", &[]);
//! }
//! assert_eq!(tracer.trace_context().span_count, 1);
//! ```

pub mod logging;
pub mod metrics;
pub mod tracer;

pub use logging::{init_logging, LoggingError, ServiceLogger};
pub use metrics::{InMemorySink, LogSink, MetricSink, MetricsCollector, TimingGuard};
pub use tracer::{ActiveSpan, Tracer};

/// Returns the last path segment of a type's name, without generics
/// (e.g. `std::io::error::Error` becomes `Error`).
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::short_type_name;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(short_type_name::<std::num::ParseIntError>(), "ParseIntError");
        assert_eq!(short_type_name::<Box<dyn std::error::Error>>(), "Box");
        assert_eq!(short_type_name::<String>(), "String");
    }
}

//! Manual span tracing.
//!
//! A [`Tracer`] owns one trace id and collects the spans finished under it.
//! Spans are opened with [`Tracer::span`] and finish when the returned
//! [`ActiveSpan`] is dropped. Parent links are set explicitly through
//! [`Tracer::child_span`]; nothing enforces a well-formed tree.

use super::short_type_name;
use crate::models::{SpanEvent, SpanRecord, SpanStatus, TraceContext, TraceExport};
use serde_json::{json, Value};
use std::fmt::Display;
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

/// Collects finished spans for a single trace.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shared::observability::Tracer;
///
/// let tracer = Tracer::new();
/// {
///     let root = tracer.span("http_request", &[("http.method", json!("GET"))]);
///     let _query = tracer.child_span(root.span_id(), "database_query", &[]);
/// }
///
/// let export = tracer.export();
/// assert_eq!(export.spans.len(), 2);
/// assert_eq!(export.spans[0].name, "database_query");
/// assert!(export.spans[1].is_root());
/// ```
#[derive(Debug)]
pub struct Tracer {
    trace_id: String,
    spans: Mutex<Vec<SpanRecord>>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    /// Creates a tracer with a random trace id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4().to_string())
    }

    /// Creates a tracer continuing an existing trace id.
    #[must_use]
    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            spans: Mutex::new(Vec::new()),
        }
    }

    /// Returns the trace id.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Opens a root span.
    pub fn span(&self, name: &str, attributes: &[(&str, Value)]) -> ActiveSpan<'_> {
        ActiveSpan::start(self, name, None, attributes)
    }

    /// Opens a span whose parent is `parent_span_id`.
    pub fn child_span(
        &self,
        parent_span_id: &str,
        name: &str,
        attributes: &[(&str, Value)],
    ) -> ActiveSpan<'_> {
        ActiveSpan::start(self, name, Some(parent_span_id.to_string()), attributes)
    }

    /// Runs `f` inside a span, marking the span failed when `f` returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f` unchanged.
    pub fn in_span<T, E, F>(&self, name: &str, attributes: &[(&str, Value)], f: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce(&mut ActiveSpan<'_>) -> Result<T, E>,
    {
        let mut span = self.span(name, attributes);
        let result = f(&mut span);
        if let Err(e) = &result {
            span.fail(e);
        }
        span.end();
        result
    }

    /// Appends a finished span.
    pub fn add_span(&self, span: SpanRecord) {
        match self.spans.lock() {
            Ok(mut spans) => spans.push(span),
            Err(_) => tracing::error!(
                component = "tracer",
                trace_id = %self.trace_id,
                span = %span.name,
                "Failed to record span: lock poisoned"
            ),
        }
    }

    /// Returns a copy of the finished spans in completion order.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Returns the trace id and the number of finished spans.
    #[must_use]
    pub fn trace_context(&self) -> TraceContext {
        TraceContext {
            trace_id: self.trace_id.clone(),
            span_count: self.spans.lock().map(|s| s.len()).unwrap_or(0),
        }
    }

    /// Exports the trace with its finished spans.
    #[must_use]
    pub fn export(&self) -> TraceExport {
        TraceExport::from_spans(self.trace_id.clone(), self.spans())
    }
}

/// A span in progress. Finishes on drop or on [`end`](Self::end).
#[derive(Debug)]
pub struct ActiveSpan<'a> {
    tracer: &'a Tracer,
    record: SpanRecord,
    started: Instant,
    failed: bool,
    ended: bool,
}

impl<'a> ActiveSpan<'a> {
    fn start(
        tracer: &'a Tracer,
        name: &str,
        parent_span_id: Option<String>,
        attributes: &[(&str, Value)],
    ) -> Self {
        let mut record = SpanRecord::new(tracer.trace_id.clone(), Uuid::new_v4().to_string(), name);
        record.parent_span_id = parent_span_id;
        record.attributes = attributes
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        record.events.push(SpanEvent::new("span.start"));

        Self {
            tracer,
            record,
            started: Instant::now(),
            failed: false,
            ended: false,
        }
    }

    /// Returns the span id.
    #[must_use]
    pub fn span_id(&self) -> &str {
        &self.record.span_id
    }

    /// Returns the trace id.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.record.trace_id
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.record.attributes.insert(key.into(), value.into());
    }

    /// Records a timestamped event.
    pub fn add_event(&mut self, name: impl Into<String>, attributes: &[(&str, Value)]) {
        let mut event = SpanEvent::new(name);
        event.attributes = attributes
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        self.record.events.push(event);
    }

    /// Marks the span failed with `error`.
    ///
    /// The `error` attribute holds the short type name and the message.
    pub fn fail<E: Display + ?Sized>(&mut self, error: &E) {
        self.fail_as(short_type_name::<E>(), &error.to_string());
    }

    /// Marks the span failed with an explicit error type and message.
    pub fn fail_as(&mut self, error_type: &str, message: &str) {
        self.failed = true;
        self.record.attributes.insert(
            "error".to_string(),
            json!({ "type": error_type, "message": message }),
        );
    }

    /// Finishes the span now.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        if !self.failed && std::thread::panicking() {
            self.fail_as("panic", "span dropped during panic");
        }

        let elapsed = self.started.elapsed();
        let mut record = std::mem::replace(
            &mut self.record,
            SpanRecord::new(String::new(), String::new(), String::new()),
        );
        record.end_time = record.start_time
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        record.duration = elapsed.as_secs_f64();
        record.status = if self.failed {
            SpanStatus::Error
        } else {
            SpanStatus::Ok
        };
        record.events.push(
            SpanEvent::new("span.end")
                .with_attribute("duration", record.duration)
                .with_attribute("status", record.status),
        );

        tracing::debug!(
            trace_id = %record.trace_id,
            span_id = %record.span_id,
            span = %record.name,
            duration = record.duration,
            status = %record.status,
            "Span finished"
        );

        self.tracer.add_span(record);
    }
}

impl Drop for ActiveSpan<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

//! Trace and span data models.
//!
//! Defines the finished-span record produced by the tracer and the exported
//! view of a whole trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use validator::Validate;

/// Status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// The span has not finished yet.
    #[default]
    Unset,
    /// The span completed without error.
    Ok,
    /// The span encountered an error.
    Error,
}

impl std::fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Ok => write!(f, "ok"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// An event within a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    /// The name of the event.
    pub name: String,
    /// Timestamp when the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Additional attributes for the event.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl SpanEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute to the event.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.attributes.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }
}

/// A finished span.
///
/// # Example
///
/// ```
/// use shared::models::{SpanRecord, SpanStatus};
///
/// let span = SpanRecord::new("trace-123", "span-456", "database_query")
///     .with_status(SpanStatus::Ok)
///     .with_attribute("db.table", "tenants");
///
/// assert!(span.validate_span().is_ok());
/// assert!(span.is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SpanRecord {
    /// Unique identifier for this span.
    #[validate(length(min = 1, message = "Span ID cannot be empty"))]
    pub span_id: String,

    /// Identifier of the trace this span belongs to.
    #[validate(length(min = 1, message = "Trace ID cannot be empty"))]
    pub trace_id: String,

    /// The parent span ID, when the caller linked one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// The name of the traced operation.
    #[validate(length(min = 1, message = "Span name cannot be empty"))]
    pub name: String,

    /// Timestamp when the span started.
    pub start_time: DateTime<Utc>,

    /// Timestamp when the span ended.
    pub end_time: DateTime<Utc>,

    /// Wall-clock duration in seconds.
    pub duration: f64,

    /// Final status.
    #[serde(default)]
    pub status: SpanStatus,

    /// Span attributes.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Events recorded during the span.
    #[serde(default)]
    pub events: Vec<SpanEvent>,
}

/// Errors that can occur during span validation.
#[derive(Debug, Error)]
pub enum SpanValidationError {
    /// The trace ID is empty.
    #[error("Trace ID cannot be empty")]
    EmptyTraceId,

    /// The span ID is empty.
    #[error("Span ID cannot be empty")]
    EmptySpanId,

    /// The span name is empty.
    #[error("Span name cannot be empty")]
    EmptyName,

    /// The end time is before the start time.
    #[error("End time cannot be before start time")]
    InvalidTimeRange,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl SpanRecord {
    /// Creates a span starting and ending now.
    #[must_use]
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            span_id: span_id.into(),
            trace_id: trace_id.into(),
            parent_span_id: None,
            name: name.into(),
            start_time: now,
            end_time: now,
            duration: 0.0,
            status: SpanStatus::default(),
            attributes: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Sets the parent span ID.
    #[must_use]
    pub fn with_parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    /// Sets the span status.
    #[must_use]
    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    /// Adds an attribute to the span.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.attributes.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }

    /// Returns true if this span has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Returns true if the span ended with an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == SpanStatus::Error
    }

    /// Validates the span.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The trace ID is empty
    /// - The span ID is empty
    /// - The name is empty
    /// - The end time is before the start time
    pub fn validate_span(&self) -> Result<(), SpanValidationError> {
        if self.trace_id.is_empty() {
            return Err(SpanValidationError::EmptyTraceId);
        }
        if self.span_id.is_empty() {
            return Err(SpanValidationError::EmptySpanId);
        }
        if self.name.is_empty() {
            return Err(SpanValidationError::EmptyName);
        }
        if self.end_time < self.start_time {
            return Err(SpanValidationError::InvalidTimeRange);
        }
        self.validate()?;
        Ok(())
    }
}

/// Context propagated alongside a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// The trace ID.
    pub trace_id: String,
    /// Number of spans finished so far.
    pub span_count: usize,
}

/// A complete exported trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceExport {
    /// The trace ID.
    pub trace_id: String,
    /// Finished spans in completion order.
    pub spans: Vec<SpanRecord>,
    /// Sum of span durations in seconds.
    pub total_duration: f64,
}

impl TraceExport {
    /// Builds an export from finished spans.
    #[must_use]
    pub fn from_spans(trace_id: impl Into<String>, spans: Vec<SpanRecord>) -> Self {
        let total_duration = spans.iter().map(|s| s.duration).sum();
        Self {
            trace_id: trace_id.into(),
            spans,
            total_duration,
        }
    }

    /// Returns the spans that ended with an error.
    pub fn errors(&self) -> impl Iterator<Item = &SpanRecord> {
        self.spans.iter().filter(|s| s.is_error())
    }

    /// Returns the direct children of the given span.
    pub fn children_of<'a>(&'a self, span_id: &'a str) -> impl Iterator<Item = &'a SpanRecord> {
        self.spans
            .iter()
            .filter(move |s| s.parent_span_id.as_deref() == Some(span_id))
    }
}

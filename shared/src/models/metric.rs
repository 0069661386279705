//! Metric sample data model.
//!
//! Defines the `MetricSample` structure buffered by the metrics collector and
//! handed to metric sinks on flush.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Kind of metric sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// An incremental value (e.g., request count).
    #[default]
    Counter,
    /// A current value that can go up or down (e.g., queue depth).
    Gauge,
    /// A sample of a distribution (e.g., payload size).
    Histogram,
    /// A duration in seconds.
    Timer,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Gauge => write!(f, "gauge"),
            Self::Histogram => write!(f, "histogram"),
            Self::Timer => write!(f, "timer"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = MetricValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(Self::Counter),
            "gauge" => Ok(Self::Gauge),
            "histogram" => Ok(Self::Histogram),
            "timer" => Ok(Self::Timer),
            other => Err(MetricValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// A single tagged measurement.
///
/// # Example
///
/// ```
/// use shared::models::{MetricKind, MetricSample};
///
/// let sample = MetricSample::new(MetricKind::Counter, "cap.api.request", 1.0)
///     .with_tag("method", "GET")
///     .with_tag("status", "200");
///
/// assert!(sample.validate_sample().is_ok());
/// assert_eq!(sample.tags.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricSample {
    /// The kind of sample.
    #[serde(rename = "type")]
    pub kind: MetricKind,

    /// Fully prefixed metric name (e.g., "`cap.tenant.create.count`").
    #[validate(length(min = 1, message = "Metric name cannot be empty"))]
    pub name: String,

    /// The sampled value; timers carry seconds.
    pub value: f64,

    /// Tags (dimensions) of the sample.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// When the sample was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Errors that can occur during metric validation.
#[derive(Debug, Error)]
pub enum MetricValidationError {
    /// The metric name is empty.
    #[error("Metric name cannot be empty")]
    EmptyName,

    /// The value is NaN or infinite.
    #[error("Metric value must be finite")]
    NonFiniteValue,

    /// The metric kind string is not recognised.
    #[error("Unknown metric type: '{0}'")]
    UnknownKind(String),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl MetricSample {
    /// Creates a new sample stamped with the current time.
    #[must_use]
    pub fn new(kind: MetricKind, name: impl Into<String>, value: f64) -> Self {
        Self {
            kind,
            name: name.into(),
            value,
            tags: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a timer sample from a duration.
    #[must_use]
    pub fn timer(name: impl Into<String>, duration: Duration) -> Self {
        Self::new(MetricKind::Timer, name, duration.as_secs_f64())
    }

    /// Adds a tag to the sample.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Merges a set of tags into the sample. Existing keys are kept.
    #[must_use]
    pub fn with_default_tags(mut self, tags: &BTreeMap<String, String>) -> Self {
        for (k, v) in tags {
            self.tags.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self
    }

    /// Sets the timestamp of the sample.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Validates the sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the value is not finite.
    pub fn validate_sample(&self) -> Result<(), MetricValidationError> {
        if self.name.is_empty() {
            return Err(MetricValidationError::EmptyName);
        }
        if !self.value.is_finite() {
            return Err(MetricValidationError::NonFiniteValue);
        }
        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_timer_from_duration() {
        let sample = MetricSample::timer("cap.db.query", Duration::from_millis(1500));
        assert_eq!(sample.kind, MetricKind::Timer);
        assert!((sample.value - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_default_tags_do_not_override() {
        let mut defaults = BTreeMap::new();
        defaults.insert("user".to_string(), "alice".to_string());
        defaults.insert("status".to_string(), "ignored".to_string());

        let sample = MetricSample::new(MetricKind::Counter, "cap.x", 1.0)
            .with_tag("status", "success")
            .with_default_tags(&defaults);

        assert_eq!(sample.tags["status"], "success");
        assert_eq!(sample.tags["user"], "alice");
    }

    #[test]
    fn test_metric_validation_empty_name() {
        let sample = MetricSample::new(MetricKind::Gauge, "", 1.0);
        assert!(matches!(
            sample.validate_sample(),
            Err(MetricValidationError::EmptyName)
        ));
    }

    #[test]
    fn test_metric_validation_non_finite() {
        let sample = MetricSample::new(MetricKind::Histogram, "cap.h", f64::NAN);
        assert!(matches!(
            sample.validate_sample(),
            Err(MetricValidationError::NonFiniteValue)
        ));
    }

    #[test]
    fn test_metric_serialization() {
        let sample = MetricSample::new(MetricKind::Counter, "cap.test_counter", 42.0)
            .with_tag("env", "production");

        let json = serde_json::to_string(&sample).unwrap();

        assert!(json.contains("\"type\":\"counter\""));
        assert!(json.contains("\"name\":\"cap.test_counter\""));
        assert!(json.contains("\"value\":42.0"));
        assert!(json.contains("\"env\":\"production\""));
    }

    #[test]
    fn test_metric_kind_parse_and_display() {
        for kind in [
            MetricKind::Counter,
            MetricKind::Gauge,
            MetricKind::Histogram,
            MetricKind::Timer,
        ] {
            assert_eq!(kind.to_string().parse::<MetricKind>().unwrap(), kind);
        }
        assert!(matches!(
            "meter".parse::<MetricKind>(),
            Err(MetricValidationError::UnknownKind(_))
        ));
    }
}

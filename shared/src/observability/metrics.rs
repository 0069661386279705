//! Metrics collection.
//!
//! [`MetricsCollector`] buffers tagged samples in memory and hands them to a
//! [`MetricSink`] once the buffer reaches its flush threshold (100 by
//! default). Flushing is fire-and-forget: there is no retry and no
//! backpressure from a slow sink.

use super::short_type_name;
use crate::config::TelemetryConfig;
use crate::context::RequestContext;
use crate::models::{MetricKind, MetricSample};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Destination of flushed samples.
pub trait MetricSink: Send + Sync {
    /// Exports a batch of samples. Failures are the sink's to log.
    fn export(&self, samples: &[MetricSample]);
}

/// Sink that writes one debug log line per sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn export(&self, samples: &[MetricSample]) {
        for sample in samples {
            match serde_json::to_string(sample) {
                Ok(json) => tracing::debug!(target: "cap::metrics", metric = %json, "METRIC"),
                Err(e) => tracing::warn!(
                    component = "metrics_collector",
                    name = %sample.name,
                    error = %e,
                    "Failed to serialize metric"
                ),
            }
        }
    }
}

/// Sink that keeps every exported sample in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    samples: RwLock<Vec<MetricSample>>,
}

impl InMemorySink {
    /// Creates a new empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all exported samples.
    #[must_use]
    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Returns samples with the given fully prefixed name.
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<MetricSample> {
        self.samples()
            .into_iter()
            .filter(|s| s.name == name)
            .collect()
    }

    /// Returns the number of exported samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns true if nothing has been exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all retained samples.
    pub fn clear(&self) {
        if let Ok(mut samples) = self.samples.write() {
            samples.clear();
        }
    }
}

impl MetricSink for InMemorySink {
    fn export(&self, samples: &[MetricSample]) {
        match self.samples.write() {
            Ok(mut stored) => stored.extend_from_slice(samples),
            Err(_) => tracing::error!(
                component = "metrics_collector",
                dropped = samples.len(),
                "Failed to acquire lock on in-memory metric sink"
            ),
        }
    }
}

/// Buffered metric collector.
///
/// # Example
///
/// ```
/// use shared::observability::{InMemorySink, MetricsCollector};
/// use std::sync::Arc;
///
/// let sink = Arc::new(InMemorySink::new());
/// let metrics = MetricsCollector::new("cap")
///     .with_sink(sink.clone())
///     .with_flush_threshold(2);
///
/// metrics.counter("login.attempt", 1.0, &[("result", "ok")]);
/// assert_eq!(metrics.buffered(), 1);
///
/// metrics.gauge("sessions.active", 12.0, &[]);
/// assert_eq!(metrics.buffered(), 0);
/// assert_eq!(sink.named("cap.login.attempt").len(), 1);
/// ```
pub struct MetricsCollector {
    prefix: String,
    context: RequestContext,
    sink: Arc<dyn MetricSink>,
    flush_threshold: usize,
    buffer: Mutex<Vec<MetricSample>>,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("prefix", &self.prefix)
            .field("flush_threshold", &self.flush_threshold)
            .field("buffered", &self.buffered())
            .finish_non_exhaustive()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::from_config(&TelemetryConfig::default())
    }
}

impl MetricsCollector {
    /// Creates a collector whose metric names start with `"{prefix}."`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            context: RequestContext::default(),
            sink: Arc::new(LogSink),
            flush_threshold: TelemetryConfig::default().flush_threshold,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Creates a collector from configuration.
    #[must_use]
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.metrics_prefix.clone()).with_flush_threshold(config.flush_threshold)
    }

    /// Sets the request context whose user and site become default tags.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Sets the sink receiving flushed samples.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the buffer size that triggers a flush (minimum 1).
    #[must_use]
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    /// Returns the metric name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Records a counter sample.
    pub fn counter(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        self.record(name, value, MetricKind::Counter, tags);
    }

    /// Records a gauge sample.
    pub fn gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        self.record(name, value, MetricKind::Gauge, tags);
    }

    /// Records a histogram sample.
    pub fn histogram(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        self.record(name, value, MetricKind::Histogram, tags);
    }

    /// Records a timer sample in seconds.
    pub fn timer(&self, name: &str, duration: Duration, tags: &[(&str, &str)]) {
        self.record(name, duration.as_secs_f64(), MetricKind::Timer, tags);
    }

    /// Records a sample of any kind.
    pub fn record(&self, name: &str, value: f64, kind: MetricKind, tags: &[(&str, &str)]) {
        let tags = tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.record_tagged(name, value, kind, tags);
    }

    fn record_tagged(&self, name: &str, value: f64, kind: MetricKind, tags: BTreeMap<String, String>) {
        let mut sample = MetricSample::new(kind, format!("{}.{name}", self.prefix), value);
        sample.tags = tags;
        let sample = sample.with_default_tags(&self.context.default_tags());
        self.store(sample);
    }

    fn store(&self, sample: MetricSample) {
        let ready = match self.buffer.lock() {
            Ok(mut buffer) => {
                buffer.push(sample);
                if buffer.len() >= self.flush_threshold {
                    std::mem::take(&mut *buffer)
                } else {
                    Vec::new()
                }
            }
            Err(_) => {
                tracing::error!(
                    component = "metrics_collector",
                    "Failed to store metric: buffer lock poisoned"
                );
                return;
            }
        };

        if !ready.is_empty() {
            self.sink.export(&ready);
        }
    }

    /// Returns the number of samples waiting to be flushed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Exports all buffered samples to the sink.
    pub fn flush(&self) {
        let drained = match self.buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(_) => {
                tracing::error!(
                    component = "metrics_collector",
                    "Failed to flush metrics: buffer lock poisoned"
                );
                return;
            }
        };

        if !drained.is_empty() {
            self.sink.export(&drained);
        }
    }

    /// Starts a scoped timer. The sample is recorded when the guard drops.
    #[must_use = "the timer records when the guard is dropped"]
    pub fn timing_context(&self, name: &str, tags: &[(&str, &str)]) -> TimingGuard<'_> {
        TimingGuard {
            collector: self,
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            start: Instant::now(),
            error_type: None,
            finished: false,
        }
    }

    /// Times a fallible call. On `Err`, the timer carries `status=error` and
    /// the short type name of `E` as `error_type`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f` unchanged.
    pub fn time<T, E>(
        &self,
        name: &str,
        tags: &[(&str, &str)],
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.timing_context(name, tags);
        let result = f();
        if result.is_err() {
            guard.fail(short_type_name::<E>());
        }
        guard.finish();
        result
    }
}

impl Drop for MetricsCollector {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Scoped timer returned by [`MetricsCollector::timing_context`].
///
/// Records a timer sample with tag `status` set to `success`, or to `error`
/// when [`fail`](Self::fail) was called or the guard drops during a panic.
pub struct TimingGuard<'a> {
    collector: &'a MetricsCollector,
    name: String,
    tags: BTreeMap<String, String>,
    start: Instant,
    error_type: Option<String>,
    finished: bool,
}

impl TimingGuard<'_> {
    /// Marks the timed operation as failed.
    pub fn fail(&mut self, error_type: impl Into<String>) {
        self.error_type = Some(error_type.into());
    }

    /// Returns the elapsed time so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Records the sample now instead of at drop.
    pub fn finish(mut self) {
        self.record();
    }

    fn record(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let duration = self.start.elapsed();
        let mut tags = std::mem::take(&mut self.tags);

        let error_type = self
            .error_type
            .take()
            .or_else(|| std::thread::panicking().then(|| "panic".to_string()));

        match error_type {
            Some(error_type) => {
                tags.insert("status".to_string(), "error".to_string());
                tags.insert("error_type".to_string(), error_type);
            }
            None => {
                tags.insert("status".to_string(), "success".to_string());
            }
        }

        self.collector
            .record_tagged(&self.name, duration.as_secs_f64(), MetricKind::Timer, tags);
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        self.record();
    }
}

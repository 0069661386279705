//! Structured logging.
//!
//! JSON lines in production, coloured human-readable lines in development.
//! Service code logs through [`ServiceLogger`], which tags every line with its
//! component name and merged context fields.

use crate::config::{LogFormat, LoggingConfig};
use crate::context::RequestContext;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Errors that can occur while installing the log subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

/// Builds the default filter directive for `level`.
///
/// Dependency noise is capped at `warn`.
#[must_use]
pub fn default_directive(level: &str) -> String {
    format!("{level},hyper=warn,tower_http=warn,redis=warn")
}

/// Installs the global log subscriber.
///
/// `RUST_LOG` overrides the configured level when set.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
        LogFormat::Pretty => builder.with_ansi(true).with_target(true).try_init(),
    };

    result.map_err(|e| LoggingError::Install(e.to_string()))
}

/// Logger bound to a component, carrying context fields.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shared::observability::ServiceLogger;
///
/// let logger = ServiceLogger::new("TenantService").with_context("region", "eu");
/// logger.info("Operation: tenant_created", json!({"tenant_name": "acme"}));
///
/// let merged = logger.merged_context(&json!({"tenant_name": "acme"}));
/// assert_eq!(merged["region"], "eu");
/// assert_eq!(merged["tenant_name"], "acme");
/// ```
#[derive(Debug, Clone)]
pub struct ServiceLogger {
    component: String,
    context: Map<String, Value>,
}

impl ServiceLogger {
    /// Creates a logger for `component`.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            context: Map::new(),
        }
    }

    /// Returns the component name.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Adds a context field included in every line.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.context.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
        self
    }

    /// Adds the user, site, request and trace of a request context.
    #[must_use]
    pub fn with_request_context(mut self, ctx: &RequestContext) -> Self {
        self.context.extend(ctx.log_fields());
        self
    }

    /// Merges the logger context with per-call fields; per-call fields win.
    /// Non-object extras are stored under `extra`.
    #[must_use]
    pub fn merged_context(&self, extra: &Value) -> Map<String, Value> {
        let mut merged = self.context.clone();
        match extra {
            Value::Object(fields) => {
                merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Value::Null => {}
            other => {
                merged.insert("extra".to_string(), other.clone());
            }
        }
        merged
    }

    /// Logs at debug level.
    pub fn debug(&self, message: &str, extra: Value) {
        self.emit(Level::DEBUG, message, &extra);
    }

    /// Logs at info level.
    pub fn info(&self, message: &str, extra: Value) {
        self.emit(Level::INFO, message, &extra);
    }

    /// Logs at warn level.
    pub fn warn(&self, message: &str, extra: Value) {
        self.emit(Level::WARN, message, &extra);
    }

    /// Logs at error level.
    pub fn error(&self, message: &str, extra: Value) {
        self.emit(Level::ERROR, message, &extra);
    }

    fn emit(&self, level: Level, message: &str, extra: &Value) {
        let context = Value::Object(self.merged_context(extra)).to_string();
        let component = self.component.as_str();

        match level {
            Level::ERROR => tracing::error!(component, context = %context, "{message}"),
            Level::WARN => tracing::warn!(component, context = %context, "{message}"),
            Level::INFO => tracing::info!(component, context = %context, "{message}"),
            Level::DEBUG => tracing::debug!(component, context = %context, "{message}"),
            _ => tracing::trace!(component, context = %context, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("debug"), "debug,hyper=warn,tower_http=warn,redis=warn");
    }

    #[test]
    fn test_merged_context_per_call_fields_win() {
        let logger = ServiceLogger::new("svc")
            .with_context("tenant", "acme")
            .with_context("attempt", 1);

        let merged = logger.merged_context(&json!({"attempt": 2, "user": "bob"}));

        assert_eq!(merged["tenant"], "acme");
        assert_eq!(merged["attempt"], 2);
        assert_eq!(merged["user"], "bob");
    }

    #[test]
    fn test_merged_context_non_object_extra() {
        let logger = ServiceLogger::new("svc");
        assert!(logger.merged_context(&Value::Null).is_empty());

        let merged = logger.merged_context(&json!(["a", "b"]));
        assert_eq!(merged["extra"], json!(["a", "b"]));
    }

    #[test]
    fn test_with_request_context() {
        let ctx = RequestContext::new().with_user("alice").with_site("acme");
        let logger = ServiceLogger::new("svc").with_request_context(&ctx);

        let merged = logger.merged_context(&Value::Null);
        assert_eq!(merged["user"], "alice");
        assert_eq!(merged["site"], "acme");
        assert_eq!(logger.component(), "svc");
    }

    #[test]
    fn test_logging_without_subscriber_does_not_panic() {
        let logger = ServiceLogger::new("svc");
        logger.debug("debug line", Value::Null);
        logger.warn("warn line", json!({"k": "v"}));
        logger.error("error line", json!("scalar"));
    }
}

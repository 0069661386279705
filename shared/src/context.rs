//! Request context.
//!
//! Carries the identity of the caller, the site being served and the active
//! tracer explicitly, so components never reach for process-global state.

use crate::observability::Tracer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Details of the HTTP request being served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Client address, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Contextual metadata attached to logs, metrics and spans.
///
/// # Example
///
/// ```
/// use shared::context::RequestContext;
///
/// let ctx = RequestContext::new()
///     .with_user("alice@example.com")
///     .with_site("acme.cap.local");
///
/// let tags = ctx.default_tags();
/// assert_eq!(tags.get("user").map(String::as_str), Some("alice@example.com"));
/// assert_eq!(tags.get("site").map(String::as_str), Some("acme.cap.local"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated user.
    pub user: Option<String>,
    /// Site (tenant host) being served.
    pub site: Option<String>,
    /// Request details.
    pub request: Option<RequestInfo>,
    /// Tracer collecting spans for the current request.
    pub tracer: Option<Arc<Tracer>>,
}

impl RequestContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the site.
    #[must_use]
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Sets the request details.
    #[must_use]
    pub fn with_request(
        mut self,
        method: impl Into<String>,
        path: impl Into<String>,
        ip: Option<String>,
    ) -> Self {
        self.request = Some(RequestInfo {
            method: method.into(),
            path: path.into(),
            ip,
        });
        self
    }

    /// Attaches the tracer for this request.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Returns the tracer for this request, if one was attached.
    #[must_use]
    pub fn current_trace(&self) -> Option<&Arc<Tracer>> {
        self.tracer.as_ref()
    }

    /// Tags added to every metric sample recorded under this context.
    #[must_use]
    pub fn default_tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        if let Some(user) = &self.user {
            tags.insert("user".to_string(), user.clone());
        }
        if let Some(site) = &self.site {
            tags.insert("site".to_string(), site.clone());
        }
        tags
    }

    /// Fields merged into structured log lines.
    #[must_use]
    pub fn log_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut fields = serde_json::Map::new();
        if let Some(user) = &self.user {
            fields.insert("user".to_string(), user.clone().into());
        }
        if let Some(site) = &self.site {
            fields.insert("site".to_string(), site.clone().into());
        }
        if let Some(request) = &self.request {
            if let Ok(value) = serde_json::to_value(request) {
                fields.insert("request".to_string(), value);
            }
        }
        if let Some(tracer) = &self.tracer {
            fields.insert("trace_id".to_string(), tracer.trace_id().into());
        }
        fields
    }
}

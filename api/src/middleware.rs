//! Request middleware.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use shared::context::RequestContext;
use shared::observability::{ServiceLogger, Tracer};
use std::sync::Arc;

/// Header carrying the trace id in both directions.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Attaches a [`RequestContext`] with a fresh [`Tracer`] to the request.
///
/// An incoming `x-trace-id` is continued; otherwise a new id is generated.
/// The id is echoed on the response.
pub async fn trace_request(mut req: Request, next: Next) -> Response {
    let header_name = HeaderName::from_static(TRACE_ID_HEADER);

    let tracer = match req.headers().get(&header_name).and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() => Tracer::with_trace_id(id),
        _ => Tracer::new(),
    };
    let tracer = Arc::new(tracer);

    let ctx = RequestContext::new()
        .with_request(req.method().as_str(), req.uri().path(), None)
        .with_tracer(tracer.clone());
    let logger = ServiceLogger::new("api").with_request_context(&ctx);
    req.extensions_mut().insert(ctx);

    let mut res = next.run(req).await;

    let trace = tracer.trace_context();
    logger.debug(
        "request_completed",
        json!({
            "status": res.status().as_u16(),
            "span_count": trace.span_count,
        }),
    );

    if let Ok(value) = HeaderValue::from_str(&trace.trace_id) {
        res.headers_mut().insert(header_name, value);
    }
    res
}

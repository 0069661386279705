//! Data models for CAP.
//!
//! This module contains the metric sample, span and tenant data structures.

pub mod metric;
pub mod tenant;
pub mod trace;

pub use metric::{MetricKind, MetricSample, MetricValidationError};
pub use tenant::{
    NewTenant, SubscriptionPlan, Tenant, TenantStatistics, TenantStatus, TenantUpdate, TenantUser,
    TenantValidationError,
};
pub use trace::{
    SpanEvent, SpanRecord, SpanStatus, SpanValidationError, TraceContext, TraceExport,
};

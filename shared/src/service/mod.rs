//! Domain services.
//!
//! [`BaseService`] carries the logging, metrics and cache plumbing;
//! [`TenantService`] builds tenant management on top of it.

pub mod base;
pub mod tenant;

pub use base::BaseService;
pub use tenant::{
    TenantError, TenantService, TENANT_ADMIN_ROLE, TENANT_CACHE_TTL, TENANT_STATS_CACHE_TTL,
    TENANT_USERS_CACHE_TTL,
};

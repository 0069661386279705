//! API route definitions.
//!
//! This module organizes all HTTP routes for the CAP API server.

mod health;
mod tenants;

pub use health::health_routes;
pub use tenants::tenants_routes;

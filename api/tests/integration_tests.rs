//! Integration tests for the CAP API.
//!
//! These tests drive the full router with in-memory state and verify tenant
//! management through the HTTP API.

mod integration_tests {
    mod common;
    mod health_tests;
    mod tenant_tests;
}

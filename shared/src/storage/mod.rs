//! Storage traits and implementations.
//!
//! The `TenantRepository` trait defines the interface for tenant persistence,
//! allowing different implementations (in-memory, database-backed, etc.).

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantRepository, RepositoryError, TenantRepository};

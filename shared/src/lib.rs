//! CAP Shared Library
//!
//! This crate contains the caching, observability and service primitives used
//! across the CAP (Civic AI Canon Platform) services.
//!
//! # Modules
//!
//! - [`cache`] - Cache manager over Redis or an in-process store, plus memoization helpers
//! - [`observability`] - Structured logging, metrics collection and span tracing
//! - [`service`] - `BaseService` composition root and the tenant service
//! - [`models`] - Metric sample, span and tenant data models
//! - [`storage`] - Repository traits and in-memory implementations
//! - [`config`] - Cache, telemetry and logging configuration
//!
//! # Example
//!
//! ```
//! use shared::cache::CacheManager;
//!
//! let cache = CacheManager::local();
//! cache.set("counter", &10, None);
//! assert_eq!(cache.decrement("counter", 3), 7);
//! assert_eq!(cache.get::<i64>("counter"), Some(7));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod context;
pub mod models;
pub mod observability;
pub mod service;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;

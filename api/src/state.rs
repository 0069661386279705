//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::config::Config;
use shared::cache::CacheManager;
use shared::config::TelemetryConfig;
use shared::service::TenantService;
use shared::storage::InMemoryTenantRepository;
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache shared by every service.
    cache: CacheManager,
    /// Tenant management service.
    tenants: Arc<TenantService>,
}

impl AppState {
    /// Creates a new application state from its parts.
    pub fn new(cache: CacheManager, tenants: Arc<TenantService>) -> Self {
        Self { cache, tenants }
    }

    /// Builds the state from server configuration.
    ///
    /// Connects to Redis when enabled, falling back to the in-process cache.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let cache = CacheManager::new(&config.cache);
        Self::with_cache(cache, &config.telemetry)
    }

    /// Creates a new application state with an in-process cache and
    /// in-memory repository.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        Self::with_cache(CacheManager::local(), &TelemetryConfig::default())
    }

    fn with_cache(cache: CacheManager, telemetry: &TelemetryConfig) -> Self {
        let tenants = TenantService::new(
            InMemoryTenantRepository::new_shared(),
            cache.clone(),
            telemetry,
        );
        Self::new(cache, Arc::new(tenants))
    }

    /// Returns the cache.
    #[must_use]
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Returns the tenant service.
    #[must_use]
    pub fn tenants(&self) -> &TenantService {
        self.tenants.as_ref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}

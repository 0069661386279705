//! Tenant management service.
//!
//! Creates, reads and updates tenants through a [`TenantRepository`], caching
//! reads and instrumenting writes through [`BaseService`].

use super::base::BaseService;
use crate::cache::CacheManager;
use crate::config::TelemetryConfig;
use crate::models::{NewTenant, Tenant, TenantStatistics, TenantUpdate, TenantUser};
use crate::storage::{RepositoryError, TenantRepository};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// TTL of cached tenant records.
pub const TENANT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// TTL of cached tenant user lists.
pub const TENANT_USERS_CACHE_TTL: Duration = Duration::from_secs(600);

/// TTL of cached tenant statistics.
pub const TENANT_STATS_CACHE_TTL: Duration = Duration::from_secs(300);

/// Role granted to the administrator created with a tenant.
pub const TENANT_ADMIN_ROLE: &str = "Tenant Admin";

/// Errors returned by the tenant service.
#[derive(Debug, Error)]
pub enum TenantError {
    /// The request failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A tenant with this name already exists.
    #[error("Tenant already exists: {0}")]
    AlreadyExists(String),

    /// No tenant with this name exists.
    #[error("Tenant not found: {0}")]
    NotFound(String),

    /// A user tried to reach a document of another tenant.
    #[error("Access denied: document belongs to tenant '{document_tenant}'")]
    IsolationViolation {
        /// Tenant of the user.
        user_tenant: String,
        /// Tenant of the document.
        document_tenant: String,
    },

    /// The repository failed.
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for TenantError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(name) => Self::AlreadyExists(name),
            RepositoryError::NotFound(name) => Self::NotFound(name),
            other @ (RepositoryError::LockError
            | RepositoryError::DuplicateUser(_)
            | RepositoryError::UserNotFound(_)) => Self::Repository(other),
        }
    }
}

fn tenant_key(name: &str) -> String {
    format!("tenant:{name}")
}

fn users_key(name: &str) -> String {
    format!("tenant:users:{name}")
}

fn stats_key(name: &str) -> String {
    format!("tenant:stats:{name}")
}

/// Tenant management service.
///
/// # Example
///
/// ```
/// use shared::cache::CacheManager;
/// use shared::config::TelemetryConfig;
/// use shared::models::{NewTenant, SubscriptionPlan};
/// use shared::service::TenantService;
/// use shared::storage::InMemoryTenantRepository;
///
/// let service = TenantService::new(
///     InMemoryTenantRepository::new_shared(),
///     CacheManager::local(),
///     &TelemetryConfig::default(),
/// );
///
/// let tenant = service
///     .create_tenant(NewTenant {
///         name: "acme".to_string(),
///         display_name: "Acme Civic".to_string(),
///         domain: None,
///         admin_email: "admin@acme.org".to_string(),
///         plan: SubscriptionPlan::Professional,
///     })
///     .unwrap();
///
/// assert_eq!(service.get_tenant("acme").unwrap(), tenant);
/// ```
pub struct TenantService {
    base: BaseService,
    repo: Arc<dyn TenantRepository>,
}

impl std::fmt::Debug for TenantService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantService")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl TenantService {
    /// Creates a tenant service.
    #[must_use]
    pub fn new(
        repo: Arc<dyn TenantRepository>,
        cache: CacheManager,
        telemetry: &TelemetryConfig,
    ) -> Self {
        Self::from_base(BaseService::new("TenantService", cache, telemetry), repo)
    }

    /// Creates a tenant service over a prebuilt [`BaseService`].
    #[must_use]
    pub fn from_base(base: BaseService, repo: Arc<dyn TenantRepository>) -> Self {
        Self { base, repo }
    }

    /// Returns the underlying service plumbing.
    #[must_use]
    pub fn base(&self) -> &BaseService {
        &self.base
    }

    /// Creates a tenant and its administrator user.
    ///
    /// An admin email that already belongs to a user keeps that user in their
    /// current tenant and grants them the admin role there.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed input, `AlreadyExists` for a
    /// duplicate name, or `Repository` if storage fails.
    pub fn create_tenant(&self, new: NewTenant) -> Result<Tenant, TenantError> {
        self.base.execute_with_metrics("tenant.create", || {
            new.validate()
                .map_err(|e| TenantError::Validation(e.to_string()))?;

            if self.repo.exists(&new.name)? {
                return Err(TenantError::AlreadyExists(new.name));
            }

            let tenant = Tenant::from_new(new);
            self.repo.insert(tenant.clone())?;
            self.assign_admin(&tenant)?;

            self.base
                .set_cached(&tenant_key(&tenant.name), &tenant, Some(TENANT_CACHE_TTL));
            self.base.log_operation(
                "tenant_created",
                json!({
                    "tenant_name": tenant.name,
                    "admin_email": tenant.admin_email,
                    "plan": tenant.plan,
                }),
            );

            Ok(tenant)
        })
    }

    fn assign_admin(&self, tenant: &Tenant) -> Result<(), TenantError> {
        let email = &tenant.admin_email;
        let Some(existing) = self.repo.user(email)? else {
            self.repo.add_user(TenantUser::new(
                email.clone(),
                tenant.name.clone(),
                &[TENANT_ADMIN_ROLE],
            ))?;
            return Ok(());
        };

        let user = self.repo.grant_role(email, TENANT_ADMIN_ROLE)?;
        self.base.invalidate_key(&users_key(&user.tenant));
        self.base.invalidate_key(&stats_key(&user.tenant));
        self.base.logger().warn(
            "tenant_admin_already_assigned",
            json!({
                "tenant_name": tenant.name,
                "admin_email": email,
                "user_tenant": existing.tenant,
            }),
        );
        Ok(())
    }

    /// Returns a tenant, reading through the cache.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no tenant has this name.
    pub fn get_tenant(&self, name: &str) -> Result<Tenant, TenantError> {
        let key = tenant_key(name);
        if let Some(tenant) = self.base.get_cached::<Tenant>(&key) {
            return Ok(tenant);
        }

        let tenant = self
            .repo
            .get(name)?
            .ok_or_else(|| TenantError::NotFound(name.to_string()))?;
        self.base.set_cached(&key, &tenant, Some(TENANT_CACHE_TTL));
        Ok(tenant)
    }

    /// Applies `update` to a tenant and drops its cached entries.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty or invalid update and `NotFound` if
    /// no tenant has this name.
    pub fn update_tenant(&self, name: &str, update: TenantUpdate) -> Result<Tenant, TenantError> {
        self.base.execute_with_metrics("tenant.update", || {
            if update.is_empty() {
                return Err(TenantError::Validation(
                    "Update contains no fields".to_string(),
                ));
            }

            let mut tenant = self
                .repo
                .get(name)?
                .ok_or_else(|| TenantError::NotFound(name.to_string()))?;

            let changed = tenant.apply(update);
            tenant
                .validate_tenant()
                .map_err(|e| TenantError::Validation(e.to_string()))?;
            self.repo.update(tenant.clone())?;

            self.base.invalidate_key(&tenant_key(name));
            self.base.invalidate_key(&stats_key(name));
            self.base.log_operation(
                "tenant_updated",
                json!({
                    "tenant_name": name,
                    "updated_fields": changed,
                }),
            );

            Ok(tenant)
        })
    }

    /// Returns the users of a tenant, reading through the cache.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no tenant has this name.
    pub fn get_tenant_users(&self, name: &str) -> Result<Vec<TenantUser>, TenantError> {
        let key = users_key(name);
        if let Some(users) = self.base.get_cached::<Vec<TenantUser>>(&key) {
            return Ok(users);
        }

        if !self.repo.exists(name)? {
            return Err(TenantError::NotFound(name.to_string()));
        }
        let users = self.repo.users(name)?;
        self.base.set_cached(&key, &users, Some(TENANT_USERS_CACHE_TTL));
        Ok(users)
    }

    /// Checks that a user of `user_tenant` may access a document of
    /// `document_tenant`. Users without a tenant are system users and pass.
    ///
    /// # Errors
    ///
    /// Returns `IsolationViolation` when the tenants differ.
    pub fn enforce_tenant_isolation(
        &self,
        user_tenant: Option<&str>,
        document_tenant: &str,
    ) -> Result<(), TenantError> {
        match user_tenant {
            None => Ok(()),
            Some(user_tenant) if user_tenant == document_tenant => Ok(()),
            Some(user_tenant) => {
                self.base.logger().warn(
                    "tenant_isolation_violation",
                    json!({
                        "user_tenant": user_tenant,
                        "document_tenant": document_tenant,
                    }),
                );
                self.base.record_metric(
                    "tenant.isolation_violation",
                    1.0,
                    &[("user_tenant", user_tenant)],
                );
                Err(TenantError::IsolationViolation {
                    user_tenant: user_tenant.to_string(),
                    document_tenant: document_tenant.to_string(),
                })
            }
        }
    }

    /// Looks up the tenant of `email` and checks it against `document_tenant`.
    ///
    /// # Errors
    ///
    /// Returns `IsolationViolation` when the tenants differ, or `Repository`
    /// if the lookup fails.
    pub fn check_user_access(&self, email: &str, document_tenant: &str) -> Result<(), TenantError> {
        let user_tenant = self.repo.tenant_of_user(email)?;
        self.enforce_tenant_isolation(user_tenant.as_deref(), document_tenant)
    }

    /// Returns usage statistics for a tenant, cached for five minutes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no tenant has this name.
    pub fn tenant_statistics(&self, name: &str) -> Result<TenantStatistics, TenantError> {
        let key = stats_key(name);
        if let Some(stats) = self.base.get_cached::<TenantStatistics>(&key) {
            return Ok(stats);
        }

        let tenant = self.get_tenant(name)?;
        let stats = TenantStatistics {
            tenant: tenant.name.clone(),
            user_count: self.repo.users(name)?.len(),
            plan: tenant.plan,
            status: tenant.status,
            age_days: (Utc::now() - tenant.created_at).num_days(),
        };
        self.base.set_cached(&key, &stats, Some(TENANT_STATS_CACHE_TTL));
        Ok(stats)
    }
}

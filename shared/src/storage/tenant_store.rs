//! Tenant repository trait and implementations.
//!
//! Provides the `TenantRepository` trait for tenant and tenant-user
//! persistence, and an `InMemoryTenantRepository` for development and testing.

use crate::models::{Tenant, TenantUser};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Failed to acquire lock on the repository.
    #[error("Failed to acquire lock on tenant repository")]
    LockError,

    /// A tenant with this name already exists.
    #[error("Tenant already exists: {0}")]
    Duplicate(String),

    /// Tenant not found.
    #[error("Tenant not found: {0}")]
    NotFound(String),

    /// A user with this email is already assigned to a tenant.
    #[error("User already exists: {0}")]
    DuplicateUser(String),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(String),
}

/// Trait for tenant storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait TenantRepository: Send + Sync {
    /// Inserts a new tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if a tenant with the same name exists.
    fn insert(&self, tenant: Tenant) -> Result<(), RepositoryError>;

    /// Gets a tenant by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn get(&self, name: &str) -> Result<Option<Tenant>, RepositoryError>;

    /// Replaces a stored tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist.
    fn update(&self, tenant: Tenant) -> Result<(), RepositoryError>;

    /// Returns true if a tenant with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn exists(&self, name: &str) -> Result<bool, RepositoryError>;

    /// Lists all tenants ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn list(&self) -> Result<Vec<Tenant>, RepositoryError>;

    /// Assigns a new user to a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not exist or a user with the same
    /// email is already assigned.
    fn add_user(&self, user: TenantUser) -> Result<(), RepositoryError>;

    /// Gets a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn user(&self, email: &str) -> Result<Option<TenantUser>, RepositoryError>;

    /// Adds `role` to an existing user, keeping their tenant. Returns the
    /// updated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist.
    fn grant_role(&self, email: &str, role: &str) -> Result<TenantUser, RepositoryError>;

    /// Lists the users of a tenant ordered by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn users(&self, tenant: &str) -> Result<Vec<TenantUser>, RepositoryError>;

    /// Returns the tenant of a user, or `None` for system users.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn tenant_of_user(&self, email: &str) -> Result<Option<String>, RepositoryError>;
}

/// In-memory tenant repository.
#[derive(Debug, Default)]
pub struct InMemoryTenantRepository {
    tenants: Arc<RwLock<HashMap<String, Tenant>>>,
    users: Arc<RwLock<HashMap<String, TenantUser>>>,
}

impl InMemoryTenantRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new repository wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TenantRepository for InMemoryTenantRepository {
    fn insert(&self, tenant: Tenant) -> Result<(), RepositoryError> {
        let mut tenants = self.tenants.write().map_err(|_| RepositoryError::LockError)?;
        if tenants.contains_key(&tenant.name) {
            return Err(RepositoryError::Duplicate(tenant.name));
        }
        tenants.insert(tenant.name.clone(), tenant);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Tenant>, RepositoryError> {
        let tenants = self.tenants.read().map_err(|_| RepositoryError::LockError)?;
        Ok(tenants.get(name).cloned())
    }

    fn update(&self, tenant: Tenant) -> Result<(), RepositoryError> {
        let mut tenants = self.tenants.write().map_err(|_| RepositoryError::LockError)?;
        match tenants.get_mut(&tenant.name) {
            Some(slot) => {
                *slot = tenant;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(tenant.name)),
        }
    }

    fn exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let tenants = self.tenants.read().map_err(|_| RepositoryError::LockError)?;
        Ok(tenants.contains_key(name))
    }

    fn list(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let tenants = self.tenants.read().map_err(|_| RepositoryError::LockError)?;
        let mut all: Vec<Tenant> = tenants.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn add_user(&self, user: TenantUser) -> Result<(), RepositoryError> {
        if !self.exists(&user.tenant)? {
            return Err(RepositoryError::NotFound(user.tenant));
        }
        let mut users = self.users.write().map_err(|_| RepositoryError::LockError)?;
        if users.contains_key(&user.email) {
            return Err(RepositoryError::DuplicateUser(user.email));
        }
        users.insert(user.email.clone(), user);
        Ok(())
    }

    fn user(&self, email: &str) -> Result<Option<TenantUser>, RepositoryError> {
        let users = self.users.read().map_err(|_| RepositoryError::LockError)?;
        Ok(users.get(email).cloned())
    }

    fn grant_role(&self, email: &str, role: &str) -> Result<TenantUser, RepositoryError> {
        let mut users = self.users.write().map_err(|_| RepositoryError::LockError)?;
        let user = users
            .get_mut(email)
            .ok_or_else(|| RepositoryError::UserNotFound(email.to_string()))?;
        if !user.has_role(role) {
            user.roles.push(role.to_string());
        }
        Ok(user.clone())
    }

    fn users(&self, tenant: &str) -> Result<Vec<TenantUser>, RepositoryError> {
        let users = self.users.read().map_err(|_| RepositoryError::LockError)?;
        let mut matching: Vec<TenantUser> = users
            .values()
            .filter(|u| u.tenant == tenant)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(matching)
    }

    fn tenant_of_user(&self, email: &str) -> Result<Option<String>, RepositoryError> {
        let users = self.users.read().map_err(|_| RepositoryError::LockError)?;
        Ok(users.get(email).map(|u| u.tenant.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTenant, SubscriptionPlan};

    fn tenant(name: &str) -> Tenant {
        Tenant::from_new(NewTenant {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            domain: None,
            admin_email: format!("admin@{name}.org"),
            plan: SubscriptionPlan::Basic,
        })
    }

    #[test]
    fn test_insert_and_get() {
        let repo = InMemoryTenantRepository::new();
        repo.insert(tenant("acme")).unwrap();

        let stored = repo.get("acme").unwrap().unwrap();
        assert_eq!(stored.display_name, "ACME");
        assert!(repo.get("globex").unwrap().is_none());
        assert!(repo.exists("acme").unwrap());
    }

    #[test]
    fn test_insert_duplicate() {
        let repo = InMemoryTenantRepository::new();
        repo.insert(tenant("acme")).unwrap();
        let result = repo.insert(tenant("acme"));
        assert!(matches!(result, Err(RepositoryError::Duplicate(name)) if name == "acme"));
    }

    #[test]
    fn test_update_missing_tenant() {
        let repo = InMemoryTenantRepository::new();
        let result = repo.update(tenant("ghost"));
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn test_list_is_sorted() {
        let repo = InMemoryTenantRepository::new();
        repo.insert(tenant("zeta")).unwrap();
        repo.insert(tenant("alpha")).unwrap();

        let names: Vec<String> = repo.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_users_per_tenant() {
        let repo = InMemoryTenantRepository::new();
        repo.insert(tenant("acme")).unwrap();
        repo.insert(tenant("globex")).unwrap();

        repo.add_user(TenantUser::new("b@acme.org", "acme", &[])).unwrap();
        repo.add_user(TenantUser::new("a@acme.org", "acme", &[])).unwrap();
        repo.add_user(TenantUser::new("x@globex.org", "globex", &[])).unwrap();

        let emails: Vec<String> = repo.users("acme").unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["a@acme.org", "b@acme.org"]);
        assert_eq!(repo.tenant_of_user("x@globex.org").unwrap().as_deref(), Some("globex"));
        assert!(repo.tenant_of_user("root@cap.local").unwrap().is_none());
    }

    #[test]
    fn test_add_user_rejects_existing_email() {
        let repo = InMemoryTenantRepository::new();
        repo.insert(tenant("acme")).unwrap();
        repo.insert(tenant("globex")).unwrap();
        repo.add_user(TenantUser::new("a@acme.org", "acme", &[])).unwrap();

        let result = repo.add_user(TenantUser::new("a@acme.org", "globex", &[]));
        assert!(matches!(result, Err(RepositoryError::DuplicateUser(email)) if email == "a@acme.org"));
        assert_eq!(repo.tenant_of_user("a@acme.org").unwrap().as_deref(), Some("acme"));
    }

    #[test]
    fn test_grant_role_keeps_tenant() {
        let repo = InMemoryTenantRepository::new();
        repo.insert(tenant("acme")).unwrap();
        repo.add_user(TenantUser::new("a@acme.org", "acme", &["Clerk"])).unwrap();

        let user = repo.grant_role("a@acme.org", "Tenant Admin").unwrap();
        assert_eq!(user.tenant, "acme");
        assert_eq!(user.roles, vec!["Clerk", "Tenant Admin"]);

        // Granting twice does not duplicate the role.
        let user = repo.grant_role("a@acme.org", "Tenant Admin").unwrap();
        assert_eq!(user.roles.len(), 2);
        assert_eq!(repo.user("a@acme.org").unwrap(), Some(user));
    }

    #[test]
    fn test_grant_role_unknown_user() {
        let repo = InMemoryTenantRepository::new();
        let result = repo.grant_role("ghost@acme.org", "Tenant Admin");
        assert!(matches!(result, Err(RepositoryError::UserNotFound(_))));
    }

    #[test]
    fn test_add_user_requires_tenant() {
        let repo = InMemoryTenantRepository::new();
        let result = repo.add_user(TenantUser::new("a@nowhere.org", "nowhere", &[]));
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }
}

//! Tenant data model.
//!
//! A tenant is an isolated customer partition. Updates go through the
//! explicit [`TenantUpdate`] struct so only known fields can change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Tenant names end up in cache keys, so they are restricted to characters
/// with no meaning in Redis glob patterns.
fn validate_tenant_name(name: &str) -> Result<(), ValidationError> {
    if name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::new("tenant_name"))
    }
}

/// Requires a dotted domain ending in an alphabetic TLD of two or more
/// letters. `admin@localhost` passes the plain email check but not this one.
fn validate_email_domain(email: &str) -> Result<(), ValidationError> {
    let tld = email
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.rsplit_once('.'))
        .map(|(host, tld)| (!host.is_empty()).then_some(tld));

    match tld {
        Some(Some(tld)) if tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(())
        }
        _ => Err(ValidationError::new("email_domain")),
    }
}

/// Subscription plan of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    /// Entry plan.
    #[default]
    Basic,
    /// Mid-tier plan.
    Professional,
    /// Top-tier plan.
    Enterprise,
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Professional => write!(f, "professional"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// Lifecycle status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    /// Tenant is operating normally.
    #[default]
    Active,
    /// Tenant access is suspended.
    Suspended,
}

/// Request to create a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTenant {
    /// Unique tenant identifier. Lowercase ASCII letters, digits and `-`.
    #[validate(
        length(min = 1, message = "Missing required field: name"),
        custom(
            function = "validate_tenant_name",
            message = "Tenant name may only use a-z, 0-9 and '-'"
        )
    )]
    pub name: String,

    /// Human-readable name.
    #[validate(length(min = 1, message = "Missing required field: display_name"))]
    pub display_name: String,

    /// Domain served for this tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Email of the tenant administrator.
    #[validate(
        email(message = "Invalid admin email"),
        custom(function = "validate_email_domain", message = "Invalid admin email")
    )]
    pub admin_email: String,

    /// Subscription plan.
    #[serde(default)]
    pub plan: SubscriptionPlan,
}

/// A stored tenant.
///
/// # Example
///
/// ```
/// use shared::models::{NewTenant, SubscriptionPlan, Tenant};
///
/// let tenant = Tenant::from_new(NewTenant {
///     name: "acme".to_string(),
///     display_name: "Acme Civic".to_string(),
///     domain: None,
///     admin_email: "admin@acme.org".to_string(),
///     plan: SubscriptionPlan::Basic,
/// });
///
/// assert!(tenant.validate_tenant().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Tenant {
    /// Unique tenant identifier. Lowercase ASCII letters, digits and `-`.
    #[validate(
        length(min = 1, message = "Missing required field: name"),
        custom(
            function = "validate_tenant_name",
            message = "Tenant name may only use a-z, 0-9 and '-'"
        )
    )]
    pub name: String,

    /// Human-readable name.
    #[validate(length(min = 1, message = "Missing required field: display_name"))]
    pub display_name: String,

    /// Domain served for this tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Email of the tenant administrator.
    #[validate(
        email(message = "Invalid admin email"),
        custom(function = "validate_email_domain", message = "Invalid admin email")
    )]
    pub admin_email: String,

    /// Subscription plan.
    pub plan: SubscriptionPlan,

    /// Lifecycle status.
    pub status: TenantStatus,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Explicit set of tenant fields that may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantUpdate {
    /// New display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// New domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// New admin email.
    #[serde(default)]
    pub admin_email: Option<String>,
    /// New plan.
    #[serde(default)]
    pub plan: Option<SubscriptionPlan>,
    /// New status.
    #[serde(default)]
    pub status: Option<TenantStatus>,
}

/// Errors that can occur during tenant validation.
#[derive(Debug, Error)]
pub enum TenantValidationError {
    /// The update carries no fields.
    #[error("Update contains no fields")]
    EmptyUpdate,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Tenant {
    /// Builds an active tenant from a creation request.
    #[must_use]
    pub fn from_new(new: NewTenant) -> Self {
        Self {
            name: new.name,
            display_name: new.display_name,
            domain: new.domain,
            admin_email: new.admin_email,
            plan: new.plan,
            status: TenantStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the tenant is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// Applies an update and returns the names of the fields it touched.
    pub fn apply(&mut self, update: TenantUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(display_name) = update.display_name {
            self.display_name = display_name;
            changed.push("display_name");
        }
        if let Some(domain) = update.domain {
            self.domain = Some(domain);
            changed.push("domain");
        }
        if let Some(admin_email) = update.admin_email {
            self.admin_email = admin_email;
            changed.push("admin_email");
        }
        if let Some(plan) = update.plan {
            self.plan = plan;
            changed.push("plan");
        }
        if let Some(status) = update.status {
            self.status = status;
            changed.push("status");
        }
        changed
    }

    /// Validates the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is empty or the email is malformed.
    pub fn validate_tenant(&self) -> Result<(), TenantValidationError> {
        self.validate()?;
        Ok(())
    }
}

impl TenantUpdate {
    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.domain.is_none()
            && self.admin_email.is_none()
            && self.plan.is_none()
            && self.status.is_none()
    }
}

/// A user assigned to a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TenantUser {
    /// Login email.
    #[validate(
        email(message = "Invalid user email"),
        custom(function = "validate_email_domain", message = "Invalid user email")
    )]
    pub email: String,

    /// Tenant the user belongs to.
    pub tenant: String,

    /// Assigned roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl TenantUser {
    /// Creates a user with the given roles.
    #[must_use]
    pub fn new(email: impl Into<String>, tenant: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            email: email.into(),
            tenant: tenant.into(),
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }

    /// Returns true if the user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Usage summary for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantStatistics {
    /// Tenant name.
    pub tenant: String,
    /// Number of users assigned to the tenant.
    pub user_count: usize,
    /// Current plan.
    pub plan: SubscriptionPlan,
    /// Current status.
    pub status: TenantStatus,
    /// Whole days since the tenant was created.
    pub age_days: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tenant() -> NewTenant {
        NewTenant {
            name: "acme".to_string(),
            display_name: "Acme".to_string(),
            domain: Some("acme.example.com".to_string()),
            admin_email: "admin@acme.example.com".to_string(),
            plan: SubscriptionPlan::Professional,
        }
    }

    #[test]
    fn test_new_tenant_validation() {
        assert!(new_tenant().validate().is_ok());

        let mut bad = new_tenant();
        bad.admin_email = "not-an-email".to_string();
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid admin email"));

        let mut missing = new_tenant();
        missing.display_name = String::new();
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_admin_email_requires_top_level_domain() {
        for email in ["a@b", "admin@localhost", "admin@acme.", "admin@acme.c0m"] {
            let mut bad = new_tenant();
            bad.admin_email = email.to_string();
            let err = bad.validate().unwrap_err();
            assert!(err.to_string().contains("Invalid admin email"), "{email}");
        }

        let mut ok = new_tenant();
        ok.admin_email = "clerk@council.gov.uk".to_string();
        assert!(ok.validate().is_ok());

        assert!(TenantUser::new("a@b", "acme", &[]).validate().is_err());
    }

    #[test]
    fn test_tenant_name_characters() {
        for name in ["acme", "acme-2", "0x"] {
            let mut new = new_tenant();
            new.name = name.to_string();
            assert!(new.validate().is_ok(), "{name}");
        }

        for name in ["a[1]", "acme*", "Acme", "acme:users", "a b"] {
            let mut new = new_tenant();
            new.name = name.to_string();
            let err = new.validate().unwrap_err();
            assert!(err.to_string().contains("Tenant name may only use"), "{name}");
        }
    }

    #[test]
    fn test_tenant_from_new_is_active() {
        let tenant = Tenant::from_new(new_tenant());
        assert!(tenant.is_active());
        assert_eq!(tenant.plan, SubscriptionPlan::Professional);
    }

    #[test]
    fn test_tenant_apply_reports_changed_fields() {
        let mut tenant = Tenant::from_new(new_tenant());
        let changed = tenant.apply(TenantUpdate {
            plan: Some(SubscriptionPlan::Enterprise),
            status: Some(TenantStatus::Suspended),
            ..TenantUpdate::default()
        });

        assert_eq!(changed, vec!["plan", "status"]);
        assert_eq!(tenant.plan, SubscriptionPlan::Enterprise);
        assert!(!tenant.is_active());
    }

    #[test]
    fn test_tenant_update_is_empty() {
        assert!(TenantUpdate::default().is_empty());
        let update = TenantUpdate {
            domain: Some("x.org".to_string()),
            ..TenantUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_plan_deserialization_defaults_to_basic() {
        let json = r#"{
            "name": "acme",
            "display_name": "Acme",
            "admin_email": "a@acme.org"
        }"#;
        let new: NewTenant = serde_json::from_str(json).unwrap();
        assert_eq!(new.plan, SubscriptionPlan::Basic);
        assert_eq!(SubscriptionPlan::Enterprise.to_string(), "enterprise");
    }

    #[test]
    fn test_tenant_user_roles() {
        let user = TenantUser::new("admin@acme.org", "acme", &["Tenant Admin"]);
        assert!(user.has_role("Tenant Admin"));
        assert!(!user.has_role("Auditor"));
        assert!(user.validate().is_ok());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

use super::{finish, text_enum, Validate};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
}

text_enum!(TenantStatus, "tenant status", {
    Active => "active",
    Inactive => "inactive",
    Suspended => "suspended",
});

/// A customer organization (law firm); the unit of data isolation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TenantStatus,
    pub settings: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Explicit provisioning request
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub subdomain: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub custom_domain: Option<String>,
    pub settings: Option<Value>,
}

impl NewTenant {
    /// Provisioning request carrying nothing but the subdomain
    pub fn for_subdomain(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            name: None,
            company_name: None,
            description: None,
            custom_domain: None,
            settings: None,
        }
    }

    /// Display name: explicit one, or "Tenant <subdomain>"
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Tenant {}", self.subdomain))
    }

    pub fn into_tenant(self, now: DateTime<Utc>) -> Tenant {
        let name = self.display_name();
        Tenant {
            id: Uuid::new_v4(),
            name,
            company_name: self.company_name,
            description: self.description,
            subdomain: self.subdomain.to_ascii_lowercase(),
            custom_domain: self.custom_domain.map(|d| d.to_ascii_lowercase()),
            status: TenantStatus::Active,
            settings: self.settings.unwrap_or_else(|| Value::Object(Map::new())),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Self-service and administrative changes. `subdomain` is immutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub custom_domain: Option<String>,
    /// Merged key by key into the stored settings object
    pub settings: Option<Map<String, Value>>,
    pub status: Option<TenantStatus>,
}

impl TenantUpdate {
    pub fn apply(self, tenant: &mut Tenant, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            tenant.name = name.trim().to_string();
        }
        if let Some(company_name) = self.company_name {
            tenant.company_name = Some(company_name);
        }
        if let Some(description) = self.description {
            tenant.description = Some(description);
        }
        if let Some(custom_domain) = self.custom_domain {
            let domain = custom_domain.trim().to_ascii_lowercase();
            tenant.custom_domain = if domain.is_empty() { None } else { Some(domain) };
        }
        if let Some(settings) = self.settings {
            if !tenant.settings.is_object() {
                tenant.settings = Value::Object(Map::new());
            }
            if let Value::Object(current) = &mut tenant.settings {
                current.extend(settings);
            }
        }
        if let Some(status) = self.status {
            tenant.status = status;
        }
        tenant.updated_at = now;
    }
}

impl Validate for TenantUpdate {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.insert("name".to_string(), "Name cannot be empty".to_string());
            }
        }
        if let Some(domain) = &self.custom_domain {
            let domain = domain.trim();
            if !domain.is_empty() && (!domain.contains('.') || domain.contains(char::is_whitespace)) {
                errors.insert("custom_domain".to_string(), "Invalid domain name".to_string());
            }
        }
        finish(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_display_name_uses_subdomain() {
        let tenant = NewTenant::for_subdomain("acme").into_tenant(Utc::now());
        assert_eq!(tenant.name, "Tenant acme");
        assert_eq!(tenant.status, TenantStatus::Active);
        assert_eq!(tenant.settings, json!({}));
    }

    #[test]
    fn settings_are_merged_not_replaced() {
        let mut tenant = NewTenant {
            settings: Some(json!({"locale": "es", "theme": "dark"})),
            ..NewTenant::for_subdomain("acme")
        }
        .into_tenant(Utc::now());

        let mut patch = Map::new();
        patch.insert("theme".into(), json!("light"));
        TenantUpdate {
            settings: Some(patch),
            ..Default::default()
        }
        .apply(&mut tenant, Utc::now());

        assert_eq!(tenant.settings, json!({"locale": "es", "theme": "light"}));
    }

    #[test]
    fn empty_custom_domain_clears_it() {
        let mut tenant = NewTenant {
            custom_domain: Some("casos.acme.es".into()),
            ..NewTenant::for_subdomain("acme")
        }
        .into_tenant(Utc::now());
        TenantUpdate {
            custom_domain: Some(" ".into()),
            ..Default::default()
        }
        .apply(&mut tenant, Utc::now());
        assert!(tenant.custom_domain.is_none());
    }
}

//! Storage seams for the unscoped tables: tenants and the global catalog.

use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Lookup, LookupCategory, NewLookup, NewRole, NewTenant, Province, Role, Tenant, TenantUpdate};

/// Outcome of an idempotent provisioning call
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub tenant: Tenant,
    /// False when a row for the subdomain already existed
    pub created: bool,
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Any tenant with this subdomain, whatever its status
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError>;

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError>;

    /// Insert the tenant unless its subdomain is taken, in which case the
    /// existing row is returned untouched. Safe to call concurrently.
    async fn provision(&self, request: NewTenant) -> Result<Provisioned, DatabaseError>;

    async fn update(&self, id: Uuid, update: TenantUpdate) -> Result<Option<Tenant>, DatabaseError>;

    /// Cheap connectivity check used by `/health`
    async fn ping(&self) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn provinces(&self) -> Result<Vec<Province>, DatabaseError>;

    /// Lookups ordered by category then code, optionally narrowed to one category
    async fn lookups(&self, category: Option<LookupCategory>) -> Result<Vec<Lookup>, DatabaseError>;

    async fn get_lookup(&self, id: Uuid) -> Result<Option<Lookup>, DatabaseError>;

    async fn create_lookup(&self, input: NewLookup) -> Result<Lookup, DatabaseError>;

    async fn roles(&self) -> Result<Vec<Role>, DatabaseError>;

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError>;

    async fn create_role(&self, input: NewRole) -> Result<Role, DatabaseError>;
}

pub(crate) const LOOKUP_CONFLICT: &str = "A lookup with this code already exists in the category";
pub(crate) const ROLE_CONFLICT: &str = "Role already exists";
pub(crate) const CUSTOM_DOMAIN_CONFLICT: &str = "Custom domain is already in use";

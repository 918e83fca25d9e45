//! Tenant scoping for persistence.
//!
//! Every record type that belongs to a tenant implements [`ScopedEntity`] and
//! is reached only through [`ScopedRepository`], whose methods all take a
//! [`TenantId`]. There is no method that reads or writes scoped rows without
//! one, so an unscoped query cannot be written against these stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::manager::DatabaseError;

/// Identifier of the tenant that owns a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        TenantId(id)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A record owned by exactly one tenant
pub trait ScopedEntity: Clone + Send + Sync + Unpin + 'static {
    /// Payload accepted on create
    type Create: Send + Sync + 'static;
    /// Partial payload accepted on update
    type Update: Send + Sync + 'static;

    /// Human-readable name used in messages ("Lawyer", "Case", ...)
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
    fn tenant_id(&self) -> TenantId;
    fn created_at(&self) -> DateTime<Utc>;

    /// Materialize a new row owned by `tenant`
    fn build(tenant: TenantId, input: Self::Create) -> Self;

    /// Apply a partial update in place and bump `updated_at`
    fn apply(&mut self, input: Self::Update);

    /// Value of the per-tenant unique column, compared case-insensitively
    fn unique_key(&self) -> Option<String> {
        None
    }

    /// Rows hidden by a soft delete
    fn is_deleted(&self) -> bool {
        false
    }

    /// Mark the row deleted in place. Returns false for entities that are
    /// hard-deleted.
    fn mark_deleted(&mut self) -> bool {
        false
    }

    /// A row this one references was hard-deleted. Clears the reference in
    /// place, or returns true when the row goes with it. Mirrors the
    /// `ON DELETE` actions of the SQL schema for stores without foreign keys.
    fn on_parent_deleted(&mut self, _parent: &str, _id: Uuid) -> bool {
        false
    }

    fn conflict_message() -> String {
        format!("{} already exists", Self::LABEL)
    }
}

/// CRUD over one scoped entity type
#[async_trait]
pub trait ScopedRepository<T: ScopedEntity>: Send + Sync {
    /// Visible rows of `tenant`, newest first
    async fn list(&self, tenant: TenantId) -> Result<Vec<T>, DatabaseError>;

    async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Option<T>, DatabaseError>;

    /// Look a row up by its unique column (case-insensitive)
    async fn find_unique(&self, tenant: TenantId, key: &str) -> Result<Option<T>, DatabaseError>;

    async fn create(&self, tenant: TenantId, input: T::Create) -> Result<T, DatabaseError>;

    async fn update(&self, tenant: TenantId, id: Uuid, input: T::Update) -> Result<Option<T>, DatabaseError>;

    /// Returns false when no visible row matched
    async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<bool, DatabaseError>;
}

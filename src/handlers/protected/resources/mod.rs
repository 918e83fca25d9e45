// handlers/protected/resources/mod.rs - generic CRUD over tenant-scoped records
//
// One set of handlers serves every plain resource:
//
//   GET    /api/<resource>        → collection::list::<T>
//   POST   /api/<resource>        → collection::create::<T>
//   GET    /api/<resource>/:id    → record::get::<T>
//   PUT    /api/<resource>/:id    → record::update::<T>
//   DELETE /api/<resource>/:id    → record::delete::<T>
//
// Per-resource rules (referenced rows, server-stamped fields, checks on the
// merged row) live in the `Resource` impls in rules.rs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Lookup, LookupCategory};
use crate::database::{ScopedEntity, ScopedRepository, TenantId};
use crate::error::ApiError;
use crate::middleware::AuthUser;

pub mod collection;
pub mod record;
pub mod rules;

#[async_trait]
pub trait Resource: ScopedEntity + Serialize {
    fn repository(state: &AppState) -> &Arc<dyn ScopedRepository<Self>>;

    /// Fill server-assigned fields of a create payload
    fn stamp(_input: &mut Self::Create, _user: &AuthUser) {}

    /// Checks that need storage: referenced rows must exist in the same tenant
    async fn check_create(_state: &AppState, _tenant: TenantId, _input: &Self::Create) -> Result<(), ApiError> {
        Ok(())
    }

    async fn check_update(_state: &AppState, _tenant: TenantId, _input: &Self::Update) -> Result<(), ApiError> {
        Ok(())
    }

    /// Checks on the row as it would look after the update
    fn check_merged(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

pub(crate) fn not_found<T: ScopedEntity>() -> ApiError {
    ApiError::not_found(format!("{} not found", T::LABEL))
}

/// A `case_id` reference must name a case of the same tenant
pub(crate) async fn ensure_case(state: &AppState, tenant: TenantId, case_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(id) = case_id {
        if state.repositories.cases.get(tenant, id).await?.is_none() {
            return Err(ApiError::invalid_field("case_id", "Judicial process not found"));
        }
    }
    Ok(())
}

/// A lookup reference must exist and belong to the expected category
pub(crate) async fn ensure_lookup(
    state: &AppState,
    field: &str,
    id: Option<Uuid>,
    category: LookupCategory,
) -> Result<(), ApiError> {
    let Some(id) = id else {
        return Ok(());
    };
    match state.catalog.get_lookup(id).await? {
        Some(Lookup { category: found, .. }) if found == category => Ok(()),
        Some(Lookup { category: found, .. }) => Err(ApiError::invalid_field(
            field,
            format!("Lookup belongs to category '{}', expected '{}'", found, category),
        )),
        None => Err(ApiError::invalid_field(field, "Lookup not found")),
    }
}

// handlers/protected/resources/rules.rs - per-resource rules for the generic handlers

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::{ensure_case, ensure_lookup, Resource};
use crate::app::AppState;
use crate::database::models::{
    Activity, Case, CasePatch, Creditor, CreditorPatch, Document, DocumentPatch, Event, EventPatch,
    Lawyer, LookupCategory, NewActivity, NewCase, NewCreditor, NewEvent,
};
use crate::database::{ScopedRepository, TenantId};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[async_trait]
impl Resource for Lawyer {
    fn repository(state: &AppState) -> &Arc<dyn ScopedRepository<Self>> {
        &state.repositories.lawyers
    }
}

/// Lawyer and lookup references shared by case create and update
async fn check_case_references(
    state: &AppState,
    tenant: TenantId,
    lawyer_id: Option<Uuid>,
    process_type_id: Option<Uuid>,
    product_id: Option<Uuid>,
    guarantee_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(id) = lawyer_id {
        if state.repositories.lawyers.get(tenant, id).await?.is_none() {
            return Err(ApiError::invalid_field("lawyer_id", "Lawyer not found"));
        }
    }
    ensure_lookup(state, "process_type_id", process_type_id, LookupCategory::ProcessType).await?;
    ensure_lookup(state, "product_id", product_id, LookupCategory::Product).await?;
    ensure_lookup(state, "guarantee_id", guarantee_id, LookupCategory::Guarantee).await
}

#[async_trait]
impl Resource for Case {
    fn repository(state: &AppState) -> &Arc<dyn ScopedRepository<Self>> {
        &state.repositories.cases
    }

    async fn check_create(state: &AppState, tenant: TenantId, input: &NewCase) -> Result<(), ApiError> {
        check_case_references(
            state,
            tenant,
            input.lawyer_id,
            input.process_type_id,
            input.product_id,
            input.guarantee_id,
        )
        .await
    }

    async fn check_update(state: &AppState, tenant: TenantId, input: &CasePatch) -> Result<(), ApiError> {
        check_case_references(
            state,
            tenant,
            input.lawyer_id,
            input.process_type_id,
            input.product_id,
            input.guarantee_id,
        )
        .await
    }
}

#[async_trait]
impl Resource for Creditor {
    fn repository(state: &AppState) -> &Arc<dyn ScopedRepository<Self>> {
        &state.repositories.creditors
    }

    async fn check_create(state: &AppState, tenant: TenantId, input: &NewCreditor) -> Result<(), ApiError> {
        ensure_case(state, tenant, input.case_id).await
    }

    async fn check_update(state: &AppState, tenant: TenantId, input: &CreditorPatch) -> Result<(), ApiError> {
        ensure_case(state, tenant, input.case_id).await
    }
}

// Documents are created by the upload handler, not through `collection::create`
#[async_trait]
impl Resource for Document {
    fn repository(state: &AppState) -> &Arc<dyn ScopedRepository<Self>> {
        &state.repositories.documents
    }

    async fn check_update(state: &AppState, tenant: TenantId, input: &DocumentPatch) -> Result<(), ApiError> {
        ensure_case(state, tenant, input.case_id).await
    }
}

#[async_trait]
impl Resource for Activity {
    fn repository(state: &AppState) -> &Arc<dyn ScopedRepository<Self>> {
        &state.repositories.activities
    }

    fn stamp(input: &mut NewActivity, user: &AuthUser) {
        input.created_by = Some(user.id);
    }

    async fn check_create(state: &AppState, tenant: TenantId, input: &NewActivity) -> Result<(), ApiError> {
        ensure_case(state, tenant, Some(input.case_id)).await
    }
}

#[async_trait]
impl Resource for Event {
    fn repository(state: &AppState) -> &Arc<dyn ScopedRepository<Self>> {
        &state.repositories.events
    }

    fn stamp(input: &mut NewEvent, user: &AuthUser) {
        input.owner_id = Some(user.id);
    }

    async fn check_create(state: &AppState, tenant: TenantId, input: &NewEvent) -> Result<(), ApiError> {
        ensure_case(state, tenant, input.case_id).await
    }

    async fn check_update(state: &AppState, tenant: TenantId, input: &EventPatch) -> Result<(), ApiError> {
        ensure_case(state, tenant, input.case_id).await
    }

    fn check_merged(&self) -> Result<(), ApiError> {
        self.check_window().map_err(ApiError::from)
    }
}

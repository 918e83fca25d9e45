// handlers/elevated/tenants.rs - platform-wide tenant administration

use axum::{extract::State, Extension};
use tracing::info;

use crate::app::AppState;
use crate::database::models::{NewTenant, Tenant, TenantUpdate, Validate};
use crate::error::ApiError;
use crate::handlers::{JsonBody, RecordId};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Tenant>> {
    Ok(ApiResponse::success(state.tenants.list().await?))
}

/**
 * POST /api/root/tenants - Provision a tenant
 *
 * Expected Input:
 * ```json
 * {
 *   "subdomain": "acme",          // Required, [a-z0-9-], 1-63 chars
 *   "name": "Bufete Acme",        // Optional, defaults to "Tenant acme"
 *   "company_name": "...",        // Optional
 *   "custom_domain": "...",       // Optional, unique
 *   "settings": { }               // Optional
 * }
 * ```
 *
 * Idempotent on the subdomain: 201 with the new row, or 200 with the row
 * that already existed.
 */
pub async fn provision(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(request): JsonBody<NewTenant>,
) -> ApiResult<Tenant> {
    let provisioned = state.provisioner.provision(request).await?;
    if provisioned.created {
        info!("Tenant {} provisioned by {}", provisioned.tenant.subdomain, auth.id);
        Ok(ApiResponse::created(provisioned.tenant))
    } else {
        Ok(ApiResponse::success(provisioned.tenant))
    }
}

pub async fn show(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<Tenant> {
    let tenant = state
        .tenants
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    Ok(ApiResponse::success(tenant))
}

/// PATCH /api/root/tenants/:id - any tenant field including `status`
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    RecordId(id): RecordId,
    JsonBody(update): JsonBody<TenantUpdate>,
) -> ApiResult<Tenant> {
    update.validate()?;
    let tenant = state
        .tenants
        .update(id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    info!("Tenant {} updated by root {} (status {})", tenant.subdomain, auth.id, tenant.status);
    Ok(ApiResponse::success(tenant))
}

// handlers/protected/tenant.rs - the caller's own tenant
//
// GET /api/tenant            current tenant
// PUT /api/tenant/settings   admin; name, company, description, custom domain, settings

use axum::{extract::State, Extension};
use tracing::info;

use crate::app::AppState;
use crate::database::models::{Tenant, TenantUpdate, Validate};
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantContext};

pub async fn current(Extension(tenant): Extension<TenantContext>) -> ApiResult<Tenant> {
    Ok(ApiResponse::success(tenant.tenant))
}

/**
 * PUT /api/tenant/settings - Self-service tenant changes
 *
 * Expected Input (all optional):
 * ```json
 * {
 *   "name": "Bufete Acme",
 *   "company_name": "Acme Abogados SLP",
 *   "description": "...",
 *   "custom_domain": "casos.acme.es",   // "" clears it
 *   "settings": { "locale": "es" }      // merged key by key
 * }
 * ```
 *
 * `status` is reserved for the root tier and `subdomain` is immutable.
 */
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(update): JsonBody<TenantUpdate>,
) -> ApiResult<Tenant> {
    auth.require_admin()?;
    if update.status.is_some() {
        return Err(ApiError::forbidden("Tenant status can only be changed by root"));
    }
    update.validate()?;

    let updated = state
        .tenants
        .update(tenant.tenant.id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    info!("Tenant {} settings updated by {}", updated.subdomain, auth.id);
    Ok(ApiResponse::success(updated))
}

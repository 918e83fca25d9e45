// handlers/protected/resources/collection.rs - GET/POST /api/<resource>

use axum::{extract::State, Extension};
use serde::de::DeserializeOwned;
use tracing::info;

use super::Resource;
use crate::app::AppState;
use crate::database::models::Validate;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantContext};

/// GET /api/<resource> - every visible row of the tenant, newest first
pub async fn list<T: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
) -> ApiResult<Vec<T>> {
    let rows = T::repository(&state).list(tenant.tenant_id).await?;
    Ok(ApiResponse::success(rows))
}

/**
 * POST /api/<resource> - Create a row in the caller's tenant
 *
 * The body never carries `tenant_id`; the row is stamped with the tenant
 * resolved for the request. Validation failures answer 400 with
 * `field_errors`, uniqueness violations 400 with a readable message.
 */
pub async fn create<T>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<AuthUser>,
    JsonBody(mut input): JsonBody<T::Create>,
) -> ApiResult<T>
where
    T: Resource,
    T::Create: DeserializeOwned + Validate,
{
    input.validate()?;
    T::stamp(&mut input, &user);
    T::check_create(&state, tenant.tenant_id, &input).await?;

    let row = T::repository(&state).create(tenant.tenant_id, input).await?;
    info!("{} {} created by {} on tenant {}", T::LABEL, row.id(), user.id, tenant.tenant.subdomain);
    Ok(ApiResponse::created(row))
}

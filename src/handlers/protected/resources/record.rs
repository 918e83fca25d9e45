// handlers/protected/resources/record.rs - GET/PUT/DELETE /api/<resource>/:id

use axum::{extract::State, Extension};
use serde::de::DeserializeOwned;
use tracing::info;

use super::{not_found, Deleted, Resource};
use crate::app::AppState;
use crate::database::models::Validate;
use crate::handlers::{JsonBody, RecordId};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantContext};

pub async fn get<T: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    RecordId(id): RecordId,
) -> ApiResult<T> {
    let row = T::repository(&state)
        .get(tenant.tenant_id, id)
        .await?
        .ok_or_else(not_found::<T>)?;
    Ok(ApiResponse::success(row))
}

/// PUT /api/<resource>/:id - partial update; absent fields keep their value
pub async fn update<T>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<AuthUser>,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<T::Update>,
) -> ApiResult<T>
where
    T: Resource,
    T::Update: DeserializeOwned + Validate + Clone,
{
    patch.validate()?;
    T::check_update(&state, tenant.tenant_id, &patch).await?;

    let repository = T::repository(&state);
    let mut merged = repository
        .get(tenant.tenant_id, id)
        .await?
        .ok_or_else(not_found::<T>)?;
    merged.apply(patch.clone());
    merged.check_merged()?;

    let row = repository
        .update(tenant.tenant_id, id, patch)
        .await?
        .ok_or_else(not_found::<T>)?;
    info!("{} {} updated by {}", T::LABEL, id, user.id);
    Ok(ApiResponse::success(row))
}

pub async fn delete<T: Resource>(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<AuthUser>,
    RecordId(id): RecordId,
) -> ApiResult<Deleted> {
    if !T::repository(&state).delete(tenant.tenant_id, id).await? {
        return Err(not_found::<T>());
    }
    info!("{} {} deleted by {}", T::LABEL, id, user.id);
    Ok(ApiResponse::success(Deleted { id, deleted: true }))
}

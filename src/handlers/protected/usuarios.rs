// handlers/protected/usuarios.rs - account management inside the tenant
//
// GET    /api/usuarios        admin
// GET    /api/usuarios/me
// GET    /api/usuarios/:id    self or admin
// PUT    /api/usuarios/:id    self or admin; role/active changes admin only
// DELETE /api/usuarios/:id    admin

use axum::{extract::State, Extension};
use serde::Deserialize;
use tracing::info;

use super::resources::Deleted;
use crate::app::AppState;
use crate::auth::{hash_password, MIN_PASSWORD_LEN};
use crate::broker::{notify_user_event, UserEvent};
use crate::database::models::catalog::ROLE_ROOT;
use crate::database::models::{User, UserPatch};
use crate::error::{ApiError, FieldErrors};
use crate::handlers::{JsonBody, RecordId};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantContext};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

fn user_not_found() -> ApiError {
    ApiError::not_found("User not found")
}

pub async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<User>> {
    auth.require_admin()?;
    Ok(ApiResponse::success(state.repositories.users.list(tenant.tenant_id).await?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<User> {
    let user = state
        .repositories
        .users
        .get(tenant.tenant_id, auth.id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(ApiResponse::success(user))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
    RecordId(id): RecordId,
) -> ApiResult<User> {
    auth.require_self_or_admin(id)?;
    let user = state
        .repositories
        .users
        .get(tenant.tenant_id, id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(ApiResponse::success(user))
}

/// Turn the request into a storage patch, enforcing who may change what
async fn build_patch(state: &AppState, auth: &AuthUser, input: UpdateUserRequest) -> Result<UserPatch, ApiError> {
    let mut errors = FieldErrors::new();
    if let Some(name) = &input.name {
        if name.trim().is_empty() {
            errors.insert("name".to_string(), "This field is required".to_string());
        }
    }
    if let Some(password) = &input.password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert(
                "password".to_string(),
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    if (input.role.is_some() || input.active.is_some()) && !auth.is_admin() {
        return Err(ApiError::forbidden("Only administrators can change roles or account status"));
    }

    let role = match input.role.as_deref().map(str::trim) {
        Some(ROLE_ROOT) => return Err(ApiError::forbidden("The root role cannot be assigned")),
        Some(role) => {
            if state.catalog.role_by_name(role).await?.is_none() {
                return Err(ApiError::invalid_field("role", format!("Unknown role '{}'", role)));
            }
            Some(role.to_string())
        }
        None => None,
    };

    let password_hash = match &input.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    Ok(UserPatch {
        name: input.name,
        password_hash,
        role,
        active: input.active,
    })
}

/**
 * PUT /api/usuarios/:id - Update an account
 *
 * Expected Input (all optional):
 * ```json
 * { "name": "Ana García", "password": "********", "role": "assistant", "active": false }
 * ```
 *
 * Anyone may change their own name and password. `role` and `active` need
 * an administrator; `root` is never assignable and root accounts are left
 * alone unless the caller is root. Publishes
 * `usuario.actualizado`.
 */
pub async fn update(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
    RecordId(id): RecordId,
    JsonBody(input): JsonBody<UpdateUserRequest>,
) -> ApiResult<User> {
    auth.require_self_or_admin(id)?;
    let target = state
        .repositories
        .users
        .get(tenant.tenant_id, id)
        .await?
        .ok_or_else(user_not_found)?;
    auth.require_can_manage(&target)?;
    let patch = build_patch(&state, &auth, input).await?;

    let user = state
        .repositories
        .users
        .update(tenant.tenant_id, id, patch)
        .await?
        .ok_or_else(user_not_found)?;

    info!("User {} updated by {}", user.id, auth.id);
    notify_user_event(state.broker.as_ref(), UserEvent::Updated, &user).await;
    Ok(ApiResponse::success(user))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
    RecordId(id): RecordId,
) -> ApiResult<Deleted> {
    auth.require_admin()?;
    if id == auth.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let user = state
        .repositories
        .users
        .get(tenant.tenant_id, id)
        .await?
        .ok_or_else(user_not_found)?;
    auth.require_can_manage(&user)?;
    if !state.repositories.users.delete(tenant.tenant_id, id).await? {
        return Err(user_not_found());
    }

    info!("User {} deleted by {}", id, auth.id);
    notify_user_event(state.broker.as_ref(), UserEvent::Deleted, &user).await;
    Ok(ApiResponse::success(Deleted { id, deleted: true }))
}

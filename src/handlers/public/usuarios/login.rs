// handlers/public/usuarios/login.rs - POST /api/usuarios/login handler

use axum::{extract::State, Extension};
use serde::Deserialize;
use tracing::info;

use super::TokenResponse;
use crate::app::AppState;
use crate::auth::{verify_password, AuthError};
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/**
 * POST /api/usuarios/login - Exchange credentials for a tenant-bound JWT
 *
 * Expected Input:
 * ```json
 * { "email": "ana@bufete.es", "password": "********" }
 * ```
 *
 * Expected Output (Success):
 * ```json
 * {
 *   "success": true,
 *   "data": {
 *     "token": "eyJhbGciOiJIUzI1NiI...",
 *     "token_type": "Bearer",
 *     "expires_in": 604800,
 *     "user": { "id": "...", "email": "ana@bufete.es", "role": "lawyer", ... }
 *   }
 * }
 * ```
 *
 * Unknown email and wrong password both answer 401 with the same message.
 * A deactivated account answers 403.
 */
pub async fn login(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(input): JsonBody<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let email = input.email.trim().to_ascii_lowercase();
    if email.is_empty() || input.password.is_empty() {
        return Err(ApiError::validation_error("Email and password are required", None));
    }

    let user = state
        .repositories
        .users
        .find_unique(tenant.tenant_id, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&input.password, &user.password_hash)? {
        info!("Failed login for {} on tenant {}", email, tenant.tenant.subdomain);
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.active {
        return Err(ApiError::forbidden("User account is inactive"));
    }

    info!("User {} logged in on tenant {}", user.id, tenant.tenant.subdomain);
    Ok(ApiResponse::success(TokenResponse::issue(&state.keys, user)?))
}

// handlers/public/usuarios/register.rs - POST /api/usuarios/register handler

use axum::{extract::State, Extension};
use serde::Deserialize;
use tracing::info;

use super::TokenResponse;
use crate::app::AppState;
use crate::auth::{hash_password, MIN_PASSWORD_LEN};
use crate::broker::{notify_user_event, UserEvent};
use crate::database::models::catalog::{ROLE_ADMIN, ROLE_LAWYER, ROLE_ROOT};
use crate::database::models::{check_email, finish, require, NewUser};
use crate::error::{ApiError, FieldErrors};
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Option<String>,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "email", &self.email);
        require(&mut errors, "name", &self.name);
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert(
                "password".to_string(),
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
        finish(errors)
    }
}

/// Role granted to a self-registered account.
///
/// Defaults to `lawyer`. `admin` is only granted to the first account of the
/// tenant and `root` never is.
pub(crate) fn registration_role(requested: Option<&str>, first_user: bool) -> Result<String, ApiError> {
    let requested = requested.map(str::trim).filter(|r| !r.is_empty());
    match requested {
        None => Ok(ROLE_LAWYER.to_string()),
        Some(ROLE_ROOT) => Err(ApiError::forbidden("The root role cannot be assigned")),
        Some(ROLE_ADMIN) if !first_user => Err(ApiError::forbidden(
            "Only the first user of a tenant can register as admin",
        )),
        Some(role) => Ok(role.to_string()),
    }
}

/**
 * POST /api/usuarios/register - Create an account in the resolved tenant
 *
 * Expected Input:
 * ```json
 * {
 *   "email": "ana@bufete.es",     // Required, unique per tenant
 *   "name": "Ana García",         // Required
 *   "password": "********",       // Required, 8+ characters
 *   "role": "lawyer"              // Optional, must be a known role
 * }
 * ```
 *
 * Expected Output (201): same shape as login (token, user). Publishes
 * `usuario.creado`.
 */
pub async fn register(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(input): JsonBody<RegisterRequest>,
) -> ApiResult<TokenResponse> {
    input.validate()?;

    let first_user = state.repositories.users.list(tenant.tenant_id).await?.is_empty();
    let role = registration_role(input.role.as_deref(), first_user)?;
    if state.catalog.role_by_name(&role).await?.is_none() {
        return Err(ApiError::invalid_field("role", format!("Unknown role '{}'", role)));
    }

    let user = state
        .repositories
        .users
        .create(
            tenant.tenant_id,
            NewUser {
                email: input.email,
                name: input.name,
                password_hash: hash_password(&input.password)?,
                role,
            },
        )
        .await?;

    info!("Registered user {} ({}) on tenant {}", user.id, user.role, tenant.tenant.subdomain);
    notify_user_event(state.broker.as_ref(), UserEvent::Created, &user).await;

    Ok(ApiResponse::created(TokenResponse::issue(&state.keys, user)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_rules() {
        assert_eq!(registration_role(None, false).unwrap(), "lawyer");
        assert_eq!(registration_role(Some("  "), true).unwrap(), "lawyer");
        assert_eq!(registration_role(Some("admin"), true).unwrap(), "admin");
        assert_eq!(registration_role(Some("assistant"), false).unwrap(), "assistant");
        assert!(registration_role(Some("admin"), false).is_err());
        assert!(registration_role(Some("root"), true).is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let input = RegisterRequest {
            email: "ana@bufete.es".into(),
            name: "Ana".into(),
            password: "short".into(),
            role: None,
        };
        assert!(input.validate().unwrap_err().contains_key("password"));
    }
}

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthError;
use crate::database::models::catalog::{ROLE_ADMIN, ROLE_ROOT};
use crate::database::models::User;
use crate::database::TenantId;
use crate::error::ApiError;
use crate::middleware::tenant::TenantContext;

/// Authenticated caller, loaded fresh from the user table on every request
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
        }
    }
}

impl AuthUser {
    pub fn is_root(&self) -> bool {
        self.role == ROLE_ROOT
    }

    /// `root` carries every admin right
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN || self.is_root()
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Administrator role required"))
        }
    }

    pub fn require_root(&self) -> Result<(), ApiError> {
        if self.is_root() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Root role required"))
        }
    }

    pub fn require_self_or_admin(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("You can only access your own account"))
        }
    }

    /// Root accounts are only managed by root, never by tenant admins
    pub fn require_can_manage(&self, target: &User) -> Result<(), ApiError> {
        if target.role == ROLE_ROOT && !self.is_root() {
            Err(ApiError::forbidden("Root accounts can only be managed by root"))
        } else {
            Ok(())
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Bearer-token authentication bound to the tenant resolved for the request.
///
/// Must run inside [`require_tenant`](crate::middleware::tenant::require_tenant).
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = request
        .extensions()
        .get::<TenantContext>()
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error("Tenant context missing"))?;

    let claims = {
        let token = bearer_token(request.headers())?;
        state.keys.verify(token)?
    };

    if claims.tenant_id != context.tenant_id.as_uuid() {
        return Err(ApiError::forbidden("Token was issued for a different tenant"));
    }

    let user = state
        .repositories
        .users
        .get(context.tenant_id, claims.sub)
        .await?
        .filter(|user| user.active)
        .ok_or_else(|| ApiError::forbidden("User account is inactive or no longer exists"))?;

    request.extensions_mut().insert(AuthUser::from(&user));
    Ok(next.run(request).await)
}

/// Gate for the elevated tier. Must run inside [`jwt_auth_middleware`].
pub async fn require_root(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>() {
        Some(user) => {
            user.require_root()?;
            Ok(next.run(request).await)
        }
        None => Err(ApiError::unauthorized("Authentication required")),
    }
}

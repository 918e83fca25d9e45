// handlers/protected/catalog.rs - roles and "maestro" lookups
//
// GET  /api/roles     any authenticated user
// POST /api/roles     root
// POST /api/maestro   root (reads are public, see handlers/public/catalog.rs)
//
// Roles and lookups are shared by every tenant, so tenant admins cannot
// write them.

use axum::{extract::State, Extension};
use tracing::info;

use crate::app::AppState;
use crate::database::models::{Lookup, NewLookup, NewRole, Role, Validate};
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

pub async fn role_list(State(state): State<AppState>) -> ApiResult<Vec<Role>> {
    Ok(ApiResponse::success(state.catalog.roles().await?))
}

pub async fn role_create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(input): JsonBody<NewRole>,
) -> ApiResult<Role> {
    auth.require_root()?;
    input.validate()?;
    let role = state.catalog.create_role(input).await?;
    info!("Role '{}' created by {}", role.name, auth.id);
    Ok(ApiResponse::created(role))
}

/**
 * POST /api/maestro - Add a lookup value
 *
 * Expected Input:
 * ```json
 * { "category": "product", "code": "leasing", "label": "Leasing" }
 * ```
 *
 * Codes are stored uppercase and are unique within their category.
 */
pub async fn lookup_create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(input): JsonBody<NewLookup>,
) -> ApiResult<Lookup> {
    auth.require_root()?;
    input.validate()?;
    let lookup = state.catalog.create_lookup(input).await?;
    info!("Lookup {}/{} created by {}", lookup.category, lookup.code, auth.id);
    Ok(ApiResponse::created(lookup))
}

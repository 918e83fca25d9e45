// handlers/public/catalog.rs - global lookup data readable without a token
//
// GET /api/provincies
// GET /api/maestro[?category=product|guarantee|process_type]
// GET /api/maestro/:id
//
// These tables are shared by every tenant. The tenant is attached when the
// Host names one, but its absence is not an error.

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;
use tracing::debug;

use crate::app::AppState;
use crate::database::models::{Lookup, LookupCategory, Province};
use crate::error::ApiError;
use crate::handlers::RecordId;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub category: Option<String>,
}

fn requested_by(tenant: &Option<Extension<TenantContext>>) -> &str {
    tenant
        .as_ref()
        .map(|Extension(ctx)| ctx.tenant.subdomain.as_str())
        .unwrap_or("-")
}

pub async fn province_list(
    State(state): State<AppState>,
    tenant: Option<Extension<TenantContext>>,
) -> ApiResult<Vec<Province>> {
    debug!("Province list requested (tenant {})", requested_by(&tenant));
    Ok(ApiResponse::success(state.catalog.provinces().await?))
}

pub async fn lookup_list(
    State(state): State<AppState>,
    tenant: Option<Extension<TenantContext>>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Vec<Lookup>> {
    let category = match query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => Some(raw.parse::<LookupCategory>().map_err(|e| ApiError::invalid_field("category", e.to_string()))?),
        None => None,
    };
    debug!("Lookup list {:?} requested (tenant {})", category, requested_by(&tenant));
    Ok(ApiResponse::success(state.catalog.lookups(category).await?))
}

pub async fn lookup_get(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<Lookup> {
    let lookup = state
        .catalog
        .get_lookup(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lookup not found"))?;
    Ok(ApiResponse::success(lookup))
}

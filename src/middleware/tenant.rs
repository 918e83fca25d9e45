// middleware/tenant.rs - Host header → TenantContext

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::app::AppState;
use crate::error::ApiError;

pub use crate::services::tenant_service::TenantContext;

fn request_host(request: &Request) -> Option<String> {
    request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
}

/// Resolve the tenant for the request or fail with 404.
///
/// In development the resolver may provision unknown subdomains; that policy
/// lives in the resolver, not here.
pub async fn require_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let host = request_host(&request);
    let context = state.resolver.resolve(host.as_deref()).await?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Attach the tenant when one matches; never provisions and never fails
pub async fn optional_tenant(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let host = request_host(&request);
    match state.resolver.lookup(host.as_deref()).await {
        Ok(Some(context)) => {
            request.extensions_mut().insert(context);
        }
        Ok(None) => {}
        Err(e) => warn!("Optional tenant lookup failed for {:?}: {}", host, e),
    }
    next.run(request).await
}

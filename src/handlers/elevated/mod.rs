// handlers/elevated/mod.rs - Elevated handlers (root JWT required)
//
// Security Level: root role on top of the protected tier
// Route Prefix: /api/root/*
// Middleware: require_tenant → jwt_auth_middleware → require_root

use axum::{routing::get, Router};

use crate::app::AppState;

pub mod tenants;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/root/tenants", get(tenants::list).post(tenants::provision))
        .route("/api/root/tenants/:id", get(tenants::show).patch(tenants::update))
}

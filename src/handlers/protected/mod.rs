// handlers/protected/mod.rs - Protected handlers (tenant JWT required)
//
// Security Level: bearer JWT issued by the resolved tenant
// Route Prefix: /api/*
// Middleware: require_tenant → jwt_auth_middleware (see app.rs)
//
// Role checks finer than "authenticated" (admin-only writes) are made in
// the handlers through AuthUser.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app::AppState;
use crate::database::models::{Activity, Case, Creditor, Document, Event, Lawyer};

pub mod catalog;
pub mod documents;
pub mod rabbitmq;
pub mod resources;
pub mod tenant;
pub mod usuarios;

use resources::{collection, record};

/// `/api/<name>` and `/api/<name>/:id` with the generic handlers for `T`
macro_rules! resource_routes {
    ($router:expr, $path:literal, $ty:ty) => {
        $router
            .route($path, get(collection::list::<$ty>).post(collection::create::<$ty>))
            .route(
                concat!($path, "/:id"),
                get(record::get::<$ty>)
                    .put(record::update::<$ty>)
                    .delete(record::delete::<$ty>),
            )
    };
}

pub fn routes() -> Router<AppState> {
    let router = Router::new()
        .route("/api/usuarios", get(usuarios::list))
        .route("/api/usuarios/me", get(usuarios::me))
        .route(
            "/api/usuarios/:id",
            get(usuarios::get).put(usuarios::update).delete(usuarios::delete),
        )
        .route("/api/documents", get(collection::list::<Document>).post(documents::upload))
        .route(
            "/api/documents/:id",
            get(record::get::<Document>)
                .put(record::update::<Document>)
                .delete(record::delete::<Document>),
        )
        .route("/api/documents/:id/download", get(documents::download))
        .route("/api/roles", get(catalog::role_list).post(catalog::role_create))
        .route("/api/maestro", post(catalog::lookup_create))
        .route("/api/rabbitmq/messages", get(rabbitmq::messages))
        .route("/api/rabbitmq/status", get(rabbitmq::status))
        .route("/api/rabbitmq/publish", post(rabbitmq::publish))
        .route("/api/tenant", get(tenant::current))
        .route("/api/tenant/settings", put(tenant::update_settings));

    let router = resource_routes!(router, "/api/lawyers", Lawyer);
    let router = resource_routes!(router, "/api/judicial-processes", Case);
    let router = resource_routes!(router, "/api/creditors", Creditor);
    let router = resource_routes!(router, "/api/activities", Activity);
    resource_routes!(router, "/api/events", Event)
}

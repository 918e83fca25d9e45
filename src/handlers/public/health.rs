// handlers/public/health.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Lexcase API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant legal case tracking API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "catalog": "/api/provincies, /api/maestro[/:id] (public, tenant optional)",
                "accounts": "/api/usuarios/register, /api/usuarios/login (public, tenant required)",
                "api": "/api/* (tenant JWT)",
                "root": "/api/root/* (root JWT)"
            }
        }
    }))
}

/**
 * GET /health - Liveness plus storage and broker reachability
 *
 * Expected Output (healthy, 200):
 * ```json
 * {
 *   "success": true,
 *   "data": {
 *     "status": "ok",
 *     "database": "connected",
 *     "broker": { "backend": "amqp", "connected": true, ... }
 *   }
 * }
 * ```
 *
 * A failed storage check answers 503 with `"status": "degraded"`. The broker
 * is reported but never degrades the service: user events are best effort.
 */
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let broker = state.broker.status().await;
    let checked_at = chrono::Utc::now().to_rfc3339();

    match state.tenants.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "version": env!("CARGO_PKG_VERSION"),
                    "database": "connected",
                    "broker": broker,
                    "timestamp": checked_at,
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": {
                        "status": "degraded",
                        "version": env!("CARGO_PKG_VERSION"),
                        "database": "unavailable",
                        "broker": broker,
                        "timestamp": checked_at,
                    }
                })),
            )
        }
    }
}

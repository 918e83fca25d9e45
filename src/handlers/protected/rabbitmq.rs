// handlers/protected/rabbitmq.rs - broker diagnostics
//
// GET  /api/rabbitmq/messages   recently consumed messages of the caller's
//                               tenant, newest first (root sees every tenant)
// GET  /api/rabbitmq/status     backend, connection and topology
// POST /api/rabbitmq/publish    admin; routing key must match usuario.*,
//                               payload is stamped with the caller's tenant

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::broker::{check_user_routing_key, BrokerStatus, ConsumedMessage};
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, TenantContext};

#[derive(Debug, Serialize)]
pub struct MessageListing {
    pub capacity: usize,
    pub count: usize,
    pub messages: Vec<ConsumedMessage>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub routing_key: String,
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct Published {
    pub routing_key: String,
    pub published: bool,
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<MessageListing> {
    let messages = if auth.is_root() {
        state.messages.recent().await
    } else {
        state.messages.recent_for_tenant(tenant.tenant_id.as_uuid()).await
    };
    Ok(ApiResponse::success(MessageListing {
        capacity: state.messages.capacity(),
        count: messages.len(),
        messages,
    }))
}

pub async fn status(State(state): State<AppState>) -> ApiResult<BrokerStatus> {
    Ok(ApiResponse::success(state.broker.status().await))
}

pub async fn publish(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(input): JsonBody<PublishRequest>,
) -> ApiResult<Published> {
    auth.require_admin()?;
    let routing_key = input.routing_key.trim().to_string();
    check_user_routing_key(&routing_key)?;

    let mut payload = match input.payload {
        Value::Object(map) => map,
        _ => return Err(ApiError::invalid_field("payload", "Payload must be a JSON object")),
    };
    payload.insert("tenant_id".to_string(), Value::String(tenant.tenant_id.to_string()));
    let payload = Value::Object(payload);

    state.broker.publish(&routing_key, &payload).await?;
    info!("Diagnostic message published on {} by {}", routing_key, auth.id);
    Ok(ApiResponse::success(Published {
        routing_key,
        published: true,
    }))
}

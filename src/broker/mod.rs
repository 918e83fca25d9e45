//! User lifecycle notifications over a topic exchange.
//!
//! Handlers publish through [`EventPublisher`]; the AMQP implementation talks
//! to RabbitMQ, the in-memory one routes messages straight into the
//! [`MessageLog`]. Consumed messages are kept in that log for the diagnostic
//! endpoints only.

pub mod amqp;
pub mod memory;

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::models::User;

pub use amqp::AmqpBroker;
pub use memory::MemoryBroker;

/// Routing keys the diagnostic publish endpoint accepts
pub const USER_EVENT_PATTERN: &str = "usuario.*";

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker connection is not available")]
    NotConnected,

    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Routing key '{0}' is not accepted")]
    InvalidRoutingKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    Created,
    Updated,
    Deleted,
}

impl UserEvent {
    pub fn routing_key(&self) -> &'static str {
        match self {
            UserEvent::Created => "usuario.creado",
            UserEvent::Updated => "usuario.actualizado",
            UserEvent::Deleted => "usuario.eliminado",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserEventPayload {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<&User> for UserEventPayload {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id.as_uuid(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokerStatus {
    pub backend: &'static str,
    pub connected: bool,
    pub exchange: String,
    pub queue: String,
    pub binding_key: String,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a JSON message on the exchange under `routing_key`
    async fn publish(&self, routing_key: &str, payload: &Value) -> Result<(), BrokerError>;

    async fn status(&self) -> BrokerStatus;
}

/// Publish a user event. Failures are logged and swallowed so that the
/// request that triggered the event still succeeds.
pub async fn notify_user_event(publisher: &dyn EventPublisher, event: UserEvent, user: &User) {
    let payload = match serde_json::to_value(UserEventPayload::from(user)) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Could not encode {} event for user {}: {}", event.routing_key(), user.id, e);
            return;
        }
    };
    match publisher.publish(event.routing_key(), &payload).await {
        Ok(()) => debug!("Published {} for user {}", event.routing_key(), user.id),
        Err(e) => warn!("Failed to publish {} for user {}: {}", event.routing_key(), user.id, e),
    }
}

/// AMQP topic matching: words are dot-separated, `*` matches exactly one word
/// and `#` matches zero or more words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((first, key_rest)) => (word == "*" || word == *first) && match_words(rest, key_rest),
            None => false,
        },
    }
}

/// Reject routing keys outside the user event namespace
pub fn check_user_routing_key(routing_key: &str) -> Result<(), BrokerError> {
    if topic_matches(USER_EVENT_PATTERN, routing_key) {
        Ok(())
    } else {
        Err(BrokerError::InvalidRoutingKey(routing_key.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumedMessage {
    pub routing_key: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

/// Bounded log of the most recently consumed messages; the oldest entry is
/// evicted once capacity is reached.
pub struct MessageLog {
    capacity: usize,
    entries: RwLock<VecDeque<ConsumedMessage>>,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn record(&self, routing_key: &str, payload: Value) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(ConsumedMessage {
            routing_key: routing_key.to_string(),
            payload,
            received_at: Utc::now(),
        });
    }

    /// Newest first
    pub async fn recent(&self) -> Vec<ConsumedMessage> {
        let entries = self.entries.read().await;
        entries.iter().rev().cloned().collect()
    }

    /// Newest first, only messages whose payload names `tenant`
    pub async fn recent_for_tenant(&self, tenant: Uuid) -> Vec<ConsumedMessage> {
        let tenant = tenant.to_string();
        let entries = self.entries.read().await;
        entries
            .iter()
            .rev()
            .filter(|m| m.payload.get("tenant_id").and_then(Value::as_str) == Some(tenant.as_str()))
            .cloned()
            .collect()
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{topic_matches, BrokerError, BrokerStatus, EventPublisher, MessageLog};
use crate::config::BrokerConfig;

/// In-process topic exchange with a single bound queue whose consumer
/// writes into the message log
pub struct MemoryBroker {
    exchange: String,
    queue: String,
    binding_key: String,
    log: Arc<MessageLog>,
}

impl MemoryBroker {
    pub fn new(config: &BrokerConfig, log: Arc<MessageLog>) -> Self {
        Self {
            exchange: config.exchange.clone(),
            queue: config.queue.clone(),
            binding_key: config.binding_key.clone(),
            log,
        }
    }
}

#[async_trait]
impl EventPublisher for MemoryBroker {
    async fn publish(&self, routing_key: &str, payload: &Value) -> Result<(), BrokerError> {
        if topic_matches(&self.binding_key, routing_key) {
            self.log.record(routing_key, payload.clone()).await;
        }
        Ok(())
    }

    async fn status(&self) -> BrokerStatus {
        BrokerStatus {
            backend: "memory",
            connected: true,
            exchange: self.exchange.clone(),
            queue: self.queue.clone(),
            binding_key: self.binding_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    #[tokio::test]
    async fn unbound_keys_are_dropped() {
        let log = Arc::new(MessageLog::new(10));
        let broker = MemoryBroker::new(&AppConfig::development().broker, log.clone());

        broker.publish("usuario.creado", &json!({"id": 1})).await.unwrap();
        broker.publish("caso.creado", &json!({"id": 2})).await.unwrap();

        let recent = log.recent().await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].routing_key, "usuario.creado");
    }
}

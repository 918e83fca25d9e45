use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{BrokerError, BrokerStatus, EventPublisher, MessageLog};
use crate::config::BrokerConfig;

const PERSISTENT: u8 = 2;
const CONSUMER_TAG: &str = "lexcase-api";

struct Link {
    // Held so the connection outlives the channel
    _connection: Connection,
    channel: Channel,
}

/// RabbitMQ publisher. The channel is opened on startup and re-opened on the
/// next publish after it fails.
pub struct AmqpBroker {
    config: BrokerConfig,
    link: Mutex<Option<Link>>,
}

impl AmqpBroker {
    /// Try to connect right away; a failure only delays the connection until
    /// the first publish.
    pub async fn start(config: BrokerConfig) -> Self {
        let broker = Self {
            config,
            link: Mutex::new(None),
        };
        if let Err(e) = broker.channel().await {
            warn!("RabbitMQ unavailable at startup, will retry on publish: {}", e);
        }
        broker
    }

    async fn channel(&self) -> Result<Channel, BrokerError> {
        let mut link = self.link.lock().await;
        if let Some(current) = link.as_ref() {
            if current.channel.status().connected() {
                return Ok(current.channel.clone());
            }
        }

        let (connection, channel) = open(&self.config).await?;
        info!("Connected to RabbitMQ exchange '{}'", self.config.exchange);
        *link = Some(Link {
            _connection: connection,
            channel: channel.clone(),
        });
        Ok(channel)
    }

    async fn reset(&self) {
        self.link.lock().await.take();
    }
}

async fn open(config: &BrokerConfig) -> Result<(Connection, Channel), BrokerError> {
    let connection = Connection::connect(&config.url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel
        .exchange_declare(
            &config.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok((connection, channel))
}

#[async_trait]
impl EventPublisher for AmqpBroker {
    async fn publish(&self, routing_key: &str, payload: &Value) -> Result<(), BrokerError> {
        let body = serde_json::to_vec(payload)?;
        let channel = self.channel().await?;
        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into());

        let confirm = channel
            .basic_publish(
                &self.config.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await;
        let outcome = match confirm {
            Ok(pending) => pending.await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            self.reset().await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn status(&self) -> BrokerStatus {
        let connected = match self.link.lock().await.as_ref() {
            Some(link) => link.channel.status().connected(),
            None => false,
        };
        BrokerStatus {
            backend: "amqp",
            connected,
            exchange: self.config.exchange.clone(),
            queue: self.config.queue.clone(),
            binding_key: self.config.binding_key.clone(),
        }
    }
}

/// Consume the notification queue forever, reconnecting after a fixed delay
/// whenever the connection drops.
pub async fn run_consumer(config: BrokerConfig, log: Arc<MessageLog>) {
    let delay = Duration::from_secs(config.reconnect_delay_secs.max(1));
    loop {
        match consume(&config, &log).await {
            Ok(()) => warn!("RabbitMQ consumer stream ended"),
            Err(e) => warn!("RabbitMQ consumer error: {}", e),
        }
        tokio::time::sleep(delay).await;
    }
}

async fn consume(config: &BrokerConfig, log: &MessageLog) -> Result<(), BrokerError> {
    let (_connection, channel) = open(config).await?;
    channel
        .queue_declare(
            &config.queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            &config.queue,
            &config.exchange,
            &config.binding_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let mut consumer = channel
        .basic_consume(
            &config.queue,
            CONSUMER_TAG,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    info!(
        "Consuming '{}' bound to '{}' with '{}'",
        config.queue, config.exchange, config.binding_key
    );

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;
        let routing_key = delivery.routing_key.as_str().to_string();
        match serde_json::from_slice::<Value>(&delivery.data) {
            Ok(payload) => {
                log.record(&routing_key, payload).await;
                delivery.ack(BasicAckOptions::default()).await?;
            }
            Err(e) => {
                warn!("Dropping unparseable message on '{}': {}", routing_key, e);
                delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await?;
            }
        }
    }
    Ok(())
}

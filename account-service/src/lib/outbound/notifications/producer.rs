use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use rdkafka::producer::FutureRecord;
use rdkafka::util::Timeout;
use thiserror::Error;

use crate::config::Config;
use crate::domain::notification::DispatchError;
use crate::domain::notification::Notification;
use crate::domain::notification::NotificationDispatcher;
use crate::outbound::notifications::messages::NotificationMessage;

#[derive(Debug, Error)]
pub enum KafkaProducerError {
    #[error("Failed to send message to Kafka: {0}")]
    SendError(String),

    #[error("Failed to serialize message: {0}")]
    SerializationError(String),
}

impl From<KafkaProducerError> for DispatchError {
    fn from(err: KafkaProducerError) -> Self {
        match err {
            KafkaProducerError::SerializationError(msg) => DispatchError::SerializationFailed(msg),
            KafkaProducerError::SendError(msg) => DispatchError::PublishFailed(msg),
        }
    }
}

/// Publishes notifications to the mail topic for the mail worker.
pub struct KafkaNotificationDispatcher {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaNotificationDispatcher {
    /// Create a producer with "at least once" delivery.
    ///
    /// # Notes:
    /// - `acks=all`: Wait for all in-sync replicas to acknowledge
    /// - `enable.idempotence=true`: Prevents duplicate messages during retries
    /// - `retry.backoff.ms=100`: Backoff between retry attempts
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        tracing::info!(
            "Initializing Kafka producer for notifications: brokers={}, topic={}",
            &config.kafka.brokers,
            &config.kafka.notifications_topic
        );

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka.brokers)
            .set("message.timeout.ms", "30000")
            .set("queue.buffering.max.messages", "10000")
            .set("compression.type", "gzip")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("retries", "10")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retry.backoff.ms", "100")
            .create()?;

        tracing::info!("Kafka producer initialized successfully");

        Ok(Self {
            producer,
            topic: config.kafka.notifications_topic.to_string(),
            timeout: Duration::from_secs(30),
        })
    }

    async fn publish(&self, message: &NotificationMessage) -> Result<(), KafkaProducerError> {
        let payload = serde_json::to_string(message)
            .map_err(|e| KafkaProducerError::SerializationError(e.to_string()))?;

        // Keyed by recipient so one user's mails stay ordered.
        let record = FutureRecord::to(&self.topic)
            .key(&message.recipient)
            .payload(&payload);

        self.producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map(|_| {
                tracing::debug!(
                    message_id = %message.message_id,
                    template = %message.template,
                    "Notification published to topic '{}'",
                    self.topic
                );
            })
            .map_err(|(err, _)| KafkaProducerError::SendError(err.to_string()))
    }
}

#[async_trait]
impl NotificationDispatcher for KafkaNotificationDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        let message = NotificationMessage::from(notification);

        self.publish(&message).await.map_err(DispatchError::from)
    }
}

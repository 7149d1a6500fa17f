use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::KafkaConfig;
use crate::domain::account::PublicationFailure;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig};
use super::event_sink::{Delivery, ProducerFactory, TopicProducer};

// ============================================================================
// Kafka transport
// ============================================================================
//
// One FutureProducer per topic, each behind its own circuit breaker so a
// topic the broker rejects does not stall the others.
//
// Records are enqueued into librdkafka in order and acknowledged later;
// idempotence keeps that order intact across internal retries.
//
// ============================================================================

pub struct KafkaProducerFactory {
    brokers: String,
    message_timeout: Duration,
    breaker: CircuitBreakerConfig,
}

impl KafkaProducerFactory {
    pub fn new(config: &KafkaConfig) -> Self {
        Self {
            brokers: config.brokers.clone(),
            message_timeout: config.message_timeout,
            breaker: CircuitBreakerConfig::default(),
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new();
        client
            .set("bootstrap.servers", &self.brokers)
            .set("message.timeout.ms", self.message_timeout.as_millis().to_string())
            .set("acks", "all")
            .set("enable.idempotence", "true");
        client
    }
}

impl ProducerFactory for KafkaProducerFactory {
    type Producer = KafkaTopicProducer;

    fn create(&self, topic: &str) -> Result<KafkaTopicProducer, PublicationFailure> {
        let producer: FutureProducer = self.client_config().create().map_err(|e| {
            PublicationFailure::ChannelConstruction {
                topic: topic.to_owned(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(topic = %topic, brokers = %self.brokers, "Created Kafka producer");

        Ok(KafkaTopicProducer {
            topic: topic.to_owned(),
            producer,
            send_timeout: self.message_timeout,
            circuit_breaker: Arc::new(CircuitBreaker::new(format!("kafka:{topic}"), self.breaker.clone())),
        })
    }
}

pub struct KafkaTopicProducer {
    topic: String,
    producer: FutureProducer,
    send_timeout: Duration,
    circuit_breaker: Arc<CircuitBreaker>,
}

const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(50);

#[async_trait]
impl TopicProducer for KafkaTopicProducer {
    async fn enqueue(&self, key: &str, payload: &[u8]) -> Result<Delivery, PublicationFailure> {
        if !self.circuit_breaker.allow() {
            tracing::error!(topic = %self.topic, "Circuit breaker open - Kafka unavailable");
            return Err(PublicationFailure::CircuitOpen);
        }

        // A full local queue is waited out up to the send timeout
        let deadline = Instant::now() + self.send_timeout;
        let delivery = loop {
            let record = FutureRecord::to(&self.topic).key(key).payload(payload);

            match self.producer.send_result(record) {
                Ok(delivery) => break delivery,
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) if Instant::now() < deadline => {}
                Err((e, _)) => {
                    self.circuit_breaker.record_failure();
                    tracing::warn!(
                        topic = %self.topic,
                        breaker = ?self.circuit_breaker.state(),
                        error = %e,
                        "Kafka enqueue failed"
                    );
                    return Err(PublicationFailure::Delivery(e.to_string()));
                }
            }

            tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
        };

        let topic = self.topic.clone();
        let breaker = self.circuit_breaker.clone();

        Ok(Box::pin(async move {
            let reason = match delivery.await {
                Ok(Ok(_)) => {
                    breaker.record_success();
                    return Ok(());
                }
                Ok(Err((e, _))) => e.to_string(),
                Err(_) => "delivery canceled".to_owned(),
            };

            breaker.record_failure();
            tracing::warn!(
                topic = %topic,
                breaker = ?breaker.state(),
                error = %reason,
                "Kafka delivery failed"
            );
            Err(PublicationFailure::Delivery(reason))
        }))
    }

    async fn flush(&self, timeout: Duration) -> Result<(), PublicationFailure> {
        // librdkafka's flush blocks the calling thread
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| PublicationFailure::Delivery(e.to_string()))?
            .map_err(|e| PublicationFailure::Delivery(e.to_string()))
    }
}

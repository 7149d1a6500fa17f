use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::domain::account::{AccountEvent, EventPublisher, PublicationFailure};
use crate::metrics::Metrics;
use super::encoding::encode_event;

// ============================================================================
// Event Sink - per-topic publication channels
// ============================================================================
//
// Each topic gets one channel, created on first use and cached:
//
//   Absent -> Constructing -> Active -> Closed
//
// - Absent -> Constructing happens under the exclusive lock, after a
//   re-check, so a topic is constructed exactly once.
// - Active channels are looked up under the shared lock only.
// - Closed is terminal and only reached through `close()`.
//
// A channel is a bounded queue drained by a worker task that owns the
// transport producer. Enqueueing waits when the queue is full.
//
// The worker hands messages to the transport in queue order without waiting
// for each acknowledgement; up to `max_pending_deliveries` acks are awaited
// concurrently and reported as they land.
//
// ============================================================================

/// Builds the transport producer for a topic. Called at most once per topic
/// while the sink is open.
pub trait ProducerFactory: Send + Sync + 'static {
    type Producer: TopicProducer;

    fn create(&self, topic: &str) -> Result<Self::Producer, PublicationFailure>;
}

/// Resolves once the transport acknowledges (or gives up on) a message.
pub type Delivery = BoxFuture<'static, Result<(), PublicationFailure>>;

/// Transport side of a topic channel.
#[async_trait]
pub trait TopicProducer: Send + Sync + 'static {
    /// Hand a message to the transport. Returns once it is queued there;
    /// the returned `Delivery` carries the acknowledgement.
    async fn enqueue(&self, key: &str, payload: &[u8]) -> Result<Delivery, PublicationFailure>;

    async fn flush(&self, timeout: Duration) -> Result<(), PublicationFailure>;
}

#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Messages buffered per topic before `publish` starts waiting
    pub channel_buffer: usize,
    /// Acknowledgements a topic worker awaits at once before it stops
    /// pulling from its queue
    pub max_pending_deliveries: usize,
    /// Upper bound on how long `close()` waits for workers to drain
    pub close_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            max_pending_deliveries: 1024,
            close_timeout: Duration::from_secs(5),
        }
    }
}

struct OutboundMessage {
    key: String,
    payload: Vec<u8>,
}

struct TopicChannel {
    sender: mpsc::Sender<OutboundMessage>,
    worker: JoinHandle<()>,
}

pub struct EventSink<F: ProducerFactory> {
    factory: F,
    channels: RwLock<HashMap<String, TopicChannel>>,
    closed: AtomicBool,
    config: SinkConfig,
    metrics: Arc<Metrics>,
}

impl<F: ProducerFactory> EventSink<F> {
    pub fn new(factory: F, config: SinkConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            factory,
            channels: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            config,
            metrics,
        }
    }

    /// Encode `event` and enqueue it on the channel for `topic`, keyed by `key`.
    ///
    /// Returns once the message is queued, not once it is delivered.
    pub async fn publish(&self, topic: &str, key: &str, event: &AccountEvent) -> Result<(), PublicationFailure> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PublicationFailure::Closed);
        }

        let payload = encode_event(event).inspect_err(|_| {
            self.metrics.record_publish_failure(topic, "encoding");
        })?;

        let sender = self.channel_for(topic).await?;

        sender
            .send(OutboundMessage {
                key: key.to_owned(),
                payload,
            })
            .await
            .map_err(|_| PublicationFailure::ChannelClosed(topic.to_owned()))
    }

    /// Double-checked lookup of the topic channel.
    async fn channel_for(&self, topic: &str) -> Result<mpsc::Sender<OutboundMessage>, PublicationFailure> {
        if let Some(channel) = self.channels.read().await.get(topic) {
            return Ok(channel.sender.clone());
        }

        let mut channels = self.channels.write().await;

        // close() may have drained the map while we waited for the lock
        if self.closed.load(Ordering::Acquire) {
            return Err(PublicationFailure::Closed);
        }
        if let Some(channel) = channels.get(topic) {
            return Ok(channel.sender.clone());
        }

        let producer = self.factory.create(topic).inspect_err(|e| {
            tracing::error!(topic = %topic, error = %e, "Failed to construct topic producer");
            self.metrics.record_publish_failure(topic, "construction");
        })?;

        let (sender, receiver) = mpsc::channel(self.config.channel_buffer);
        let worker = tokio::spawn(run_topic_worker(
            topic.to_owned(),
            producer,
            receiver,
            self.config.max_pending_deliveries.max(1),
            self.config.close_timeout,
            self.metrics.clone(),
        ));

        channels.insert(
            topic.to_owned(),
            TopicChannel {
                sender: sender.clone(),
                worker,
            },
        );
        self.metrics.record_channel_opened(topic);

        tracing::info!(topic = %topic, "Opened publication channel");

        Ok(sender)
    }

    /// Tear down every cached channel.
    ///
    /// Queues are closed and each worker gets until the close timeout to
    /// drain and flush; workers still running after that are aborted and
    /// their pending messages are lost.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::warn!("Event sink already closed");
            return;
        }

        let channels: Vec<(String, TopicChannel)> = self.channels.write().await.drain().collect();
        self.metrics.record_channels_closed(channels.len());

        let deadline = tokio::time::Instant::now() + self.config.close_timeout;

        for (topic, channel) in channels {
            let TopicChannel { sender, mut worker } = channel;
            drop(sender);

            match tokio::time::timeout_at(deadline, &mut worker).await {
                Ok(Ok(())) => tracing::info!(topic = %topic, "Closed publication channel"),
                Ok(Err(e)) => tracing::error!(topic = %topic, error = %e, "Topic worker terminated abnormally"),
                Err(_) => {
                    tracing::warn!(topic = %topic, "Topic worker did not drain in time, aborting");
                    worker.abort();
                }
            }
        }
    }

    pub async fn active_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.channels.read().await.keys().cloned().collect();
        topics.sort();
        topics
    }
}

#[async_trait]
impl<F: ProducerFactory> EventPublisher for EventSink<F> {
    async fn publish(&self, topic: &str, key: &str, event: &AccountEvent) -> Result<(), PublicationFailure> {
        EventSink::publish(self, topic, key, event).await
    }
}

/// Drain one topic queue into its producer, in enqueue order.
///
/// Acks are collected concurrently; once the queue closes the remaining
/// acks are awaited before the producer is flushed.
async fn run_topic_worker<P: TopicProducer>(
    topic: String,
    producer: P,
    mut receiver: mpsc::Receiver<OutboundMessage>,
    max_pending: usize,
    flush_timeout: Duration,
    metrics: Arc<Metrics>,
) {
    let mut pending = FuturesUnordered::new();
    let mut open = true;

    while open || !pending.is_empty() {
        tokio::select! {
            message = receiver.recv(), if open && pending.len() < max_pending => {
                let Some(OutboundMessage { key, payload }) = message else {
                    open = false;
                    continue;
                };

                let started = Instant::now();
                match producer.enqueue(&key, &payload).await {
                    Ok(delivery) => pending.push(async move { (key, started, delivery.await) }),
                    Err(e) => report_delivery(&topic, &key, started, Err(e), &metrics),
                }
            }
            Some((key, started, result)) = pending.next(), if !pending.is_empty() => {
                report_delivery(&topic, &key, started, result, &metrics);
            }
            else => break,
        }
    }

    if let Err(e) = producer.flush(flush_timeout).await {
        tracing::warn!(topic = %topic, error = %e, "Producer flush failed");
    }

    tracing::debug!(topic = %topic, "Topic worker stopped");
}

fn report_delivery(
    topic: &str,
    key: &str,
    started: Instant,
    result: Result<(), PublicationFailure>,
    metrics: &Metrics,
) {
    metrics.record_delivery(topic, started.elapsed().as_secs_f64(), result.is_ok());

    match result {
        Ok(()) => tracing::debug!(topic = %topic, key = %key, "Event delivered"),
        Err(e) => tracing::error!(topic = %topic, key = %key, error = %e, "Event delivery failed"),
    }
}

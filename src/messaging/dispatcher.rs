use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::domain::account::{AccountEvent, EventPublisher};
use crate::metrics::Metrics;

// ============================================================================
// Event Dispatcher - bounded fire-and-forget publication
// ============================================================================
//
// The account service never waits on the bus. Each event is published from
// its own task, and the number of such tasks is capped by a semaphore. When
// every permit is taken the event is dropped and counted instead of queued.
//
// ============================================================================

#[derive(Clone)]
pub struct EventDispatcher {
    publisher: Arc<dyn EventPublisher>,
    permits: Arc<Semaphore>,
    capacity: usize,
    metrics: Arc<Metrics>,
}

impl EventDispatcher {
    pub fn new(publisher: Arc<dyn EventPublisher>, max_in_flight: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            publisher,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            capacity: max_in_flight,
            metrics,
        }
    }

    /// Publish `event` in the background. Returns immediately.
    ///
    /// Returns false when the event was dropped because too many
    /// publications are already in flight.
    pub fn dispatch(&self, event: AccountEvent) -> bool {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    kind = event.kind(),
                    account_id = %event.account_id(),
                    at = %event.timestamp(),
                    "Publication pool saturated, dropping event"
                );
                self.metrics.record_dropped();
                return false;
            }
        };

        let publisher = self.publisher.clone();
        tokio::spawn(async move {
            let topic = event.kind();
            if let Err(e) = publisher.publish(topic, &event.key(), &event).await {
                tracing::error!(
                    topic,
                    account_id = %event.account_id(),
                    error = %e,
                    "Failed to publish account event"
                );
            }
            drop(permit);
        });

        true
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Wait until every dispatched publication has finished, or `timeout`
    /// elapses. Returns true when the dispatcher went idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let Ok(capacity) = u32::try_from(self.capacity) else {
            return false;
        };

        match tokio::time::timeout(timeout, self.permits.acquire_many(capacity)).await {
            Ok(Ok(_all)) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                tracing::warn!(in_flight = self.in_flight(), "Timed out waiting for in-flight events");
                false
            }
        }
    }
}

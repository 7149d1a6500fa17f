// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::{start_infra_server, InfraState};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Account operations served over gRPC (by operation and outcome)
// - Event publication (published, failed, dropped, delivery latency)
// - Per-topic channel lifecycle
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Account operation metrics
    pub account_operations: IntCounterVec,

    // Event publication metrics
    pub events_published: IntCounterVec,
    pub events_failed: IntCounterVec,
    pub events_dropped: IntCounter,
    pub event_delivery_duration: HistogramVec,

    // Topic channel metrics
    pub topic_channels_created: IntCounterVec,
    pub topic_channels_active: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let account_operations = IntCounterVec::new(
            Opts::new("account_operations_total", "Account operations served"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(account_operations.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Events delivered to the transport"),
            &["topic"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let events_failed = IntCounterVec::new(
            Opts::new("events_failed_total", "Events that could not be published"),
            &["topic", "reason"],
        )?;
        registry.register(Box::new(events_failed.clone()))?;

        let events_dropped = IntCounter::new(
            "events_dropped_total",
            "Events dropped because the publication pool was saturated",
        )?;
        registry.register(Box::new(events_dropped.clone()))?;

        let event_delivery_duration = HistogramVec::new(
            HistogramOpts::new("event_delivery_duration_seconds", "Transport delivery duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["topic"],
        )?;
        registry.register(Box::new(event_delivery_duration.clone()))?;

        let topic_channels_created = IntCounterVec::new(
            Opts::new("topic_channels_created_total", "Per-topic publication channels constructed"),
            &["topic"],
        )?;
        registry.register(Box::new(topic_channels_created.clone()))?;

        let topic_channels_active = IntGauge::new(
            "topic_channels_active",
            "Per-topic publication channels currently cached",
        )?;
        registry.register(Box::new(topic_channels_active.clone()))?;

        Ok(Self {
            registry,
            account_operations,
            events_published,
            events_failed,
            events_dropped,
            event_delivery_duration,
            topic_channels_created,
            topic_channels_active,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_operation(&self, operation: &str, outcome: &str) {
        self.account_operations.with_label_values(&[operation, outcome]).inc();
    }

    pub fn record_delivery(&self, topic: &str, duration_secs: f64, success: bool) {
        if success {
            self.events_published.with_label_values(&[topic]).inc();
        } else {
            self.events_failed.with_label_values(&[topic, "delivery"]).inc();
        }
        self.event_delivery_duration.with_label_values(&[topic]).observe(duration_secs);
    }

    pub fn record_publish_failure(&self, topic: &str, reason: &str) {
        self.events_failed.with_label_values(&[topic, reason]).inc();
    }

    pub fn record_dropped(&self) {
        self.events_dropped.inc();
    }

    pub fn record_channel_opened(&self, topic: &str) {
        self.topic_channels_created.with_label_values(&[topic]).inc();
        self.topic_channels_active.inc();
    }

    pub fn record_channels_closed(&self, count: usize) {
        self.topic_channels_active.sub(count as i64);
    }
}

// ============================================================================
// Messaging - account events onto the bus
// ============================================================================
//
//   AccountService --dispatch--> EventDispatcher --publish--> EventSink
//        EventSink --per-topic queue--> worker --> KafkaTopicProducer
//
// ============================================================================

pub mod dispatcher;
pub mod encoding;
pub mod event_sink;
pub mod kafka;

pub use dispatcher::EventDispatcher;
pub use event_sink::{EventSink, SinkConfig};
pub use kafka::KafkaProducerFactory;

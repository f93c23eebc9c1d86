//! Kafka：生产者、批量消费者与死信队列

pub mod consumer;
pub mod dlq;
pub mod producer;

pub use consumer::{BatchConsumer, BatchHandler};
pub use dlq::DlqMessage;
pub use producer::Producer;

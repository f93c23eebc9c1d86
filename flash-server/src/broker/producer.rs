//! Kafka 生产者

use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;

use crate::core::config::KafkaConfig;

/// 发送超时
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka 生产者包装，克隆廉价
#[derive(Clone)]
pub struct Producer {
    inner: FutureProducer,
}

impl Producer {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let inner = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()?;
        Ok(Self { inner })
    }

    /// 发送一条消息并等待确认
    pub async fn send(&self, topic: &str, payload: &str) -> Result<(), KafkaError> {
        let record = FutureRecord::<(), str>::to(topic).payload(payload);
        self.inner
            .send(record, SEND_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|(e, _)| e)
    }
}

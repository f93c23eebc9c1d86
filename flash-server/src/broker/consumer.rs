//! Kafka 批量消费者
//!
//! 攒够 batch_size 条或等满 flush_interval 毫秒即刷盘，整批交给
//! handler 在一个事务内处理。批次失败不提交 offset，seek 回退重投；
//! 单条消息按 `{partition}:{offset}` 记录重试次数，超过 max_retries
//! 投递死信并放行分区。

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::dlq::{self, DlqMessage};
use super::producer::Producer;
use crate::core::config::KafkaConfig;
use crate::core::ServiceError;

/// 重试表容量上限，超过则整表清空重新计数
const RETRY_MAP_CAPACITY: usize = 65_536;

/// 批量消息处理接口，由订单物化服务实现
#[async_trait::async_trait]
pub trait BatchHandler: Send + Sync {
    /// 整批处理；返回 Err 表示整批回退重试
    async fn process_batch(&self, payloads: Vec<Vec<u8>>) -> Result<(), ServiceError>;
}

struct Buffered {
    partition: i32,
    offset: i64,
    payload: Vec<u8>,
}

/// 批量消费者
pub struct BatchConsumer {
    consumer: StreamConsumer,
    producer: Producer,
    topic: String,
    dlq_topic: String,
    batch_size: usize,
    flush_interval: Duration,
    max_retries: i32,
    /// {partition, offset} → 重试次数；超限的条目保留为墓碑，
    /// seek 重投后据此过滤，随后一次成功刷盘连带提交其 offset
    retry_counts: HashMap<(i32, i64), i32>,
}

impl BatchConsumer {
    pub fn new(config: &KafkaConfig, producer: Producer) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .create()?;
        consumer.subscribe(&[config.topic.as_str()])?;

        Ok(Self {
            consumer,
            producer,
            topic: config.topic.clone(),
            dlq_topic: config.dlq_topic.clone(),
            batch_size: config.batch_size.max(1),
            flush_interval: Duration::from_millis(config.flush_interval_ms.max(1)),
            max_retries: config.max_retries,
            retry_counts: HashMap::new(),
        })
    }

    /// 消费循环，阻塞直到 shutdown
    pub async fn run(mut self, handler: &dyn BatchHandler, shutdown: CancellationToken) {
        tracing::info!(
            topic = %self.topic,
            batch_size = self.batch_size,
            flush_interval_ms = self.flush_interval.as_millis() as u64,
            "Batch consumer started"
        );

        let mut buffer: Vec<Buffered> = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // select 的分支只做事件提取，处理放在外面，避免 recv future
        // 对 consumer 的借用和 flush 的可变借用打架
        enum Event {
            Shutdown,
            Flush,
            Message(Buffered),
            RecvError,
        }

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => Event::Shutdown,
                _ = ticker.tick() => Event::Flush,
                received = self.consumer.recv() => match received {
                    Ok(msg) => Event::Message(Buffered {
                        partition: msg.partition(),
                        offset: msg.offset(),
                        payload: msg.payload().unwrap_or_default().to_vec(),
                    }),
                    Err(e) => {
                        tracing::error!(error = %e, "Consumer receive error");
                        Event::RecvError
                    }
                },
            };

            match event {
                Event::Shutdown => {
                    self.flush(&mut buffer, handler).await;
                    tracing::info!("Batch consumer stopping");
                    break;
                }
                Event::Flush => self.flush(&mut buffer, handler).await,
                Event::Message(msg) => {
                    buffer.push(msg);
                    if buffer.len() >= self.batch_size {
                        self.flush(&mut buffer, handler).await;
                    }
                }
                Event::RecvError => tokio::time::sleep(Duration::from_secs(1)).await,
            }
        }
    }

    async fn flush(&mut self, buffer: &mut Vec<Buffered>, handler: &dyn BatchHandler) {
        if buffer.is_empty() {
            return;
        }

        // 墓碑过滤：已投死信的消息不再参与处理，offset 随本批提交
        let live: Vec<&Buffered> = buffer
            .iter()
            .filter(|m| {
                self.retry_counts
                    .get(&(m.partition, m.offset))
                    .is_none_or(|count| *count <= self.max_retries)
            })
            .collect();

        let payloads: Vec<Vec<u8>> = live.iter().map(|m| m.payload.clone()).collect();
        let started = Instant::now();

        match handler.process_batch(payloads).await {
            Ok(()) => {
                self.commit(buffer);
                for m in buffer.iter() {
                    self.retry_counts.remove(&(m.partition, m.offset));
                }
                tracing::info!(
                    count = buffer.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Batch processed"
                );
            }
            Err(e) => {
                tracing::error!(
                    count = buffer.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Batch processing failed"
                );
                self.handle_batch_failure(buffer, &e.to_string()).await;
            }
        }
        buffer.clear();
    }

    /// 成功批次：按分区提交最大 offset + 1
    fn commit(&self, buffer: &[Buffered]) {
        let mut latest: HashMap<i32, i64> = HashMap::new();
        for m in buffer {
            latest
                .entry(m.partition)
                .and_modify(|o| *o = (*o).max(m.offset))
                .or_insert(m.offset);
        }

        let mut tpl = TopicPartitionList::new();
        for (partition, offset) in latest {
            let _ = tpl.add_partition_offset(&self.topic, partition, Offset::Offset(offset + 1));
        }
        if let Err(e) = self.consumer.commit(&tpl, CommitMode::Async) {
            tracing::error!(error = %e, "Offset commit failed");
        }
    }

    /// 失败批次：计数 +1，超限投死信，分区 seek 回最早的待重试 offset
    async fn handle_batch_failure(&mut self, buffer: &[Buffered], err: &str) {
        if self.retry_counts.len() > RETRY_MAP_CAPACITY {
            tracing::warn!("Retry map over capacity, resetting");
            self.retry_counts.clear();
        }

        let mut seek_to: HashMap<i32, i64> = HashMap::new();
        for m in buffer {
            let count = self
                .retry_counts
                .entry((m.partition, m.offset))
                .or_insert(0);
            if *count > self.max_retries {
                // 墓碑：已投过死信，offset 随下一个成功批次提交
                continue;
            }
            *count += 1;

            if *count > self.max_retries {
                let retries = *count - 1;
                let payload = String::from_utf8_lossy(&m.payload).into_owned();
                tracing::warn!(
                    partition = m.partition,
                    offset = m.offset,
                    retries,
                    "Message exhausted retries, sending to DLQ"
                );
                dlq::send_to_dlq(
                    &self.producer,
                    &self.dlq_topic,
                    DlqMessage::new(self.topic.as_str(), payload, retries, err),
                )
                .await;
                continue;
            }

            seek_to
                .entry(m.partition)
                .and_modify(|o| *o = (*o).min(m.offset))
                .or_insert(m.offset);
        }

        for (partition, offset) in seek_to {
            if let Err(e) = self.consumer.seek(
                &self.topic,
                partition,
                Offset::Offset(offset),
                Duration::from_secs(5),
            ) {
                tracing::error!(partition, offset, error = %e, "Partition seek failed");
            }
        }
    }
}

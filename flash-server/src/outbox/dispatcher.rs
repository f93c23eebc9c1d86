//! Outbox 派发与补偿
//!
//! 两条异步路径共用 outbox_messages 表：
//! - 业务提交后的即时转发（尽力而为，失败留给补偿）
//! - 周期补偿：扫描超时未发送的行，重发或投死信
//!
//! 至少一次投递；消费方按 order_num 幂等。

use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use shared::models::OutboxMessage;

use crate::broker::dlq::{self, DlqMessage};
use crate::broker::Producer;
use crate::core::config::KafkaConfig;
use crate::db;

/// 每轮补偿扫描的行数上限
const SCAN_LIMIT: i64 = 100;
/// 已发送消息保留天数
const RETENTION_DAYS: i64 = 7;
/// 清理间隔
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Outbox 补偿派发器
pub struct OutboxDispatcher {
    pool: PgPool,
    producer: Producer,
    dlq_topic: String,
    max_retries: i32,
    scan_interval: Duration,
    timeout_secs: i64,
}

impl OutboxDispatcher {
    pub fn new(pool: PgPool, producer: Producer, config: &KafkaConfig) -> Self {
        Self {
            pool,
            producer,
            dlq_topic: config.dlq_topic.clone(),
            max_retries: config.max_retries.max(1),
            scan_interval: Duration::from_secs(config.outbox_scan_interval_secs.max(1)),
            timeout_secs: config.outbox_timeout_secs.max(1),
        }
    }

    /// 业务提交后的即时转发：发送成功标记 sent，失败留给补偿任务
    pub fn spawn_forward(pool: PgPool, producer: Producer, msg: OutboxMessage) {
        tokio::spawn(async move {
            if let Err(e) = producer.send(&msg.topic, &msg.payload).await {
                tracing::warn!(
                    msg_id = msg.id,
                    error = %e,
                    "Immediate outbox forward failed, compensator will retry"
                );
                return;
            }
            if let Err(e) = db::outbox::mark_sent(&pool, msg.id).await {
                tracing::error!(msg_id = msg.id, error = %e, "Failed to mark outbox message sent");
            }
        });
    }

    /// 补偿循环，阻塞直到 shutdown
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            scan_interval_secs = self.scan_interval.as_secs(),
            timeout_secs = self.timeout_secs,
            "Outbox compensator started"
        );

        let mut scan_ticker = tokio::time::interval(self.scan_interval);
        let mut cleanup_ticker = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Outbox compensator stopping");
                    break;
                }
                _ = scan_ticker.tick() => self.compensate().await,
                _ = cleanup_ticker.tick() => self.cleanup().await,
            }
        }
    }

    /// 补偿一轮：超时 pending 行最旧优先，重发或投死信
    async fn compensate(&self) {
        let msgs = match db::outbox::pending_messages(&self.pool, self.timeout_secs, SCAN_LIMIT)
            .await
        {
            Ok(msgs) => msgs,
            Err(e) => {
                tracing::error!(error = %e, "Outbox scan failed");
                return;
            }
        };

        if msgs.is_empty() {
            return;
        }
        tracing::info!(count = msgs.len(), "Found outbox messages to compensate");

        for msg in msgs {
            self.process_message(msg).await;
        }
    }

    async fn process_message(&self, msg: OutboxMessage) {
        if msg.retry_count >= self.max_retries {
            tracing::warn!(
                msg_id = msg.id,
                retry_count = msg.retry_count,
                "Outbox message exhausted retries, marking failed"
            );
            if let Err(e) =
                db::outbox::mark_failed(&self.pool, msg.id, "max retries exceeded").await
            {
                tracing::error!(msg_id = msg.id, error = %e, "Failed to mark outbox message failed");
            }
            dlq::send_to_dlq(
                &self.producer,
                &self.dlq_topic,
                DlqMessage::new(
                    msg.topic.as_str(),
                    msg.payload,
                    msg.retry_count,
                    "max retries exceeded",
                ),
            )
            .await;
            return;
        }

        match self.producer.send(&msg.topic, &msg.payload).await {
            Ok(()) => {
                if let Err(e) = db::outbox::mark_sent(&self.pool, msg.id).await {
                    tracing::error!(msg_id = msg.id, error = %e, "Failed to mark outbox message sent");
                    return;
                }
                tracing::info!(msg_id = msg.id, "Outbox message compensated");
            }
            Err(e) => {
                tracing::warn!(msg_id = msg.id, error = %e, "Outbox resend failed, will retry");
                if let Err(incr_err) =
                    db::outbox::incr_retry(&self.pool, msg.id, &e.to_string()).await
                {
                    tracing::error!(msg_id = msg.id, error = %incr_err, "Failed to bump retry count");
                }
            }
        }
    }

    /// 清理已发送超过保留期的旧消息
    async fn cleanup(&self) {
        match db::outbox::cleanup_old(&self.pool, RETENTION_DAYS).await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "Old outbox messages cleaned up"),
            Err(e) => tracing::error!(error = %e, "Outbox cleanup failed"),
        }
    }
}

//! 死信队列
//!
//! 重试耗尽的消息连同失败元数据投递到死信主题，保留原始消息体
//! 供人工或旁路系统处理。

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::producer::Producer;

/// 死信消息结构，包含原始消息和元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqMessage {
    /// 原始主题
    pub original_topic: String,
    /// 原始消息体
    pub original_value: String,
    /// 重试次数
    pub retry_count: i32,
    /// 最后一次错误
    pub last_error: String,
    /// 失败时间戳 (Unix ms)
    pub failed_at: i64,
}

impl DlqMessage {
    pub fn new(
        original_topic: impl Into<String>,
        original_value: impl Into<String>,
        retry_count: i32,
        last_error: impl Into<String>,
    ) -> Self {
        Self {
            original_topic: original_topic.into(),
            original_value: original_value.into(),
            retry_count,
            last_error: last_error.into(),
            failed_at: Utc::now().timestamp_millis(),
        }
    }
}

/// 将失败消息投递到死信主题；主题未配置时仅告警
pub async fn send_to_dlq(producer: &Producer, dlq_topic: &str, msg: DlqMessage) {
    if dlq_topic.is_empty() {
        tracing::warn!("DLQ topic not configured, dropping dead letter");
        return;
    }

    let payload = match serde_json::to_string(&msg) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize DLQ message");
            return;
        }
    };

    match producer.send(dlq_topic, &payload).await {
        Ok(()) => {
            tracing::info!(
                dlq_topic,
                original_topic = %msg.original_topic,
                retry_count = msg.retry_count,
                "Message sent to DLQ"
            );
        }
        Err(e) => {
            tracing::error!(dlq_topic, error = %e, "Failed to send message to DLQ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dlq_envelope_shape() {
        let msg = DlqMessage::new("seckill", r#"{"order_num":"1"}"#, 3, "broker down");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["original_topic"], "seckill");
        assert_eq!(value["original_value"], r#"{"order_num":"1"}"#);
        assert_eq!(value["retry_count"], 3);
        assert_eq!(value["last_error"], "broker down");
        assert!(value["failed_at"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_dlq_round_trip() {
        let msg = DlqMessage::new("t", "v", 1, "e");
        let json = serde_json::to_string(&msg).unwrap();
        let back: DlqMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.original_topic, "t");
        assert_eq!(back.retry_count, 1);
    }
}

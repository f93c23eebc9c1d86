//! 订单处理状态缓存
//!
//! 秒杀入口先写 pending，worker 落库后改写 ready/failed，前端据此轮询
//! 拿到 order_id / payment_id。TTL 10 分钟，避免长时间占用内存。

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use super::keys;
use crate::core::ServiceResult;

/// pending 状态缓存 TTL（秒）
pub const PENDING_ORDER_TTL_SECS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Ready,
    Failed,
}

/// 入口排队结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_num: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    pub payment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    pub status: PendingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PendingOrder {
    /// 物化成功的终态
    pub fn ready(order_num: String, order_id: i64, payment_id: String) -> Self {
        Self {
            order_num,
            order_id: Some(order_id),
            payment_id,
            product_id: None,
            user_id: None,
            price_cents: None,
            status: PendingStatus::Ready,
            message: None,
        }
    }

    /// 物化失败的终态
    pub fn failed(order_num: String, message: impl Into<String>) -> Self {
        Self {
            order_num,
            order_id: None,
            payment_id: String::new(),
            product_id: None,
            user_id: None,
            price_cents: None,
            status: PendingStatus::Failed,
            message: Some(message.into()),
        }
    }
}

/// 缓存订单处理状态
pub async fn set(conn: &mut ConnectionManager, entry: &PendingOrder) -> ServiceResult<()> {
    let key = keys::pending_key(&entry.order_num);
    let data = serde_json::to_string(entry)?;
    conn.set_ex::<_, _, ()>(key, data, PENDING_ORDER_TTL_SECS).await?;
    Ok(())
}

/// 读取订单处理状态
pub async fn get(
    conn: &mut ConnectionManager,
    order_num: &str,
) -> ServiceResult<Option<PendingOrder>> {
    let raw: Option<String> = conn.get(keys::pending_key(order_num)).await?;
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// 标记处理失败，便于前端提示；失败只记日志
pub async fn mark_failed(conn: &mut ConnectionManager, order_num: &str, message: &str) {
    let entry = PendingOrder::failed(order_num.to_string(), message);
    if let Err(e) = set(conn, &entry).await {
        tracing::warn!(order_num, error = %e, "Failed to mark pending order failed");
    }
}

/// Pipeline 批量写入终态（worker 落库后调用）
pub async fn publish_batch(
    conn: &mut ConnectionManager,
    entries: &[PendingOrder],
) -> ServiceResult<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut pipe = redis::pipe();
    for entry in entries {
        let key = keys::pending_key(&entry.order_num);
        let data = serde_json::to_string(entry)?;
        pipe.set_ex(key, data, PENDING_ORDER_TTL_SECS).ignore();
    }
    pipe.query_async::<()>(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_serde_round_trip() {
        let entry = PendingOrder {
            order_num: "1001".into(),
            order_id: None,
            payment_id: "2001".into(),
            product_id: Some(7),
            user_id: Some(42),
            price_cents: Some(19900),
            status: PendingStatus::Pending,
            message: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: PendingOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, PendingStatus::Pending);
        assert_eq!(back.product_id, Some(7));
        assert!(json.contains(r#""status":"pending""#));
    }

    #[test]
    fn test_ready_omits_empty_fields() {
        let entry = PendingOrder::ready("1001".into(), 5, "2001".into());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "ready");
        assert_eq!(value["order_id"], 5);
        assert!(value.get("product_id").is_none());
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_failed_carries_message() {
        let entry = PendingOrder::failed("1001".into(), "sold out");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "sold out");
    }
}

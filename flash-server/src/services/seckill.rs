//! 秒杀服务
//!
//! Redis 原子扣减保护库存；Outbox 模式保证消息最终一致：先写本地
//! 消息表，再异步发送 Kafka，订单落库由 worker 完成。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared::error::ErrorCode;

use crate::cache::pending::{self, PendingOrder, PendingStatus};
use crate::cache::scripts::{self, ReserveOutcome};
use crate::core::{AppState, ServiceError, ServiceResult};
use crate::db;
use crate::outbox::OutboxDispatcher;

/// 秒杀队列消息，入口与 worker 共用，避免消息格式漂移
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeckillMessage {
    pub user_id: i64,
    pub product_id: i64,
    pub order_num: String,
    pub payment_id: String,
    pub price_cents: i64,
    pub time: DateTime<Utc>,
}

/// 秒杀接口返回，前端据此轮询订单状态
#[derive(Debug, Clone, Serialize)]
pub struct SeckillResult {
    pub order_num: String,
    pub payment_id: String,
    pub status: PendingStatus,
}

/// 秒杀抢购
///
/// 1. 活动窗口校验（缓存读商品）
/// 2. Redis 原子预占；传输错误按「结果未知」拒绝，不回滚
/// 3. 生成订单号/支付号，写 Outbox；落盘失败回补缓存
/// 4. 预写 pending 状态 + 尽力即时转发
pub async fn reserve(
    state: &AppState,
    user_id: i64,
    product_id: i64,
) -> ServiceResult<SeckillResult> {
    let mut conn = state.redis.clone();

    // 0. 校验商品存在与活动窗口
    let product = state
        .product_cache
        .get(&mut conn, &state.pool, product_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::ProductNotFound))?;

    let now = Utc::now();
    if now < product.start_time {
        return Err(ServiceError::code(ErrorCode::NotStarted));
    }
    if let Some(end_time) = product.end_time {
        if now > end_time {
            return Err(ServiceError::code(ErrorCode::Ended));
        }
    }

    // 1. 原子预占
    let outcome = match scripts::reserve(&mut conn, product_id, user_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // 结果未知：拒绝本次请求，不能回滚
            tracing::error!(user_id, product_id, error = %e, "Reserve script transport error");
            return Err(ServiceError::code(ErrorCode::ServiceBusy));
        }
    };
    match outcome {
        ReserveOutcome::Repeat => return Err(ServiceError::code(ErrorCode::RepeatBuy)),
        ReserveOutcome::SoldOut => return Err(ServiceError::code(ErrorCode::SoldOut)),
        ReserveOutcome::Reserved => {}
    }

    // 2. 生成订单号/支付号，校验价格
    let order_num = state.ids.next_string();
    let payment_id = state.ids.next_string();
    let price_cents = product.price_cents;
    if price_cents <= 0 {
        scripts::rollback_reservation(&mut conn, product_id, user_id).await;
        return Err(ServiceError::code(ErrorCode::ServiceBusy));
    }

    let msg = SeckillMessage {
        user_id,
        product_id,
        order_num: order_num.clone(),
        payment_id: payment_id.clone(),
        price_cents,
        time: now,
    };
    let payload = match serde_json::to_string(&msg) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(order_num, error = %e, "Seckill message serialization failed");
            scripts::rollback_reservation(&mut conn, product_id, user_id).await;
            return Err(ServiceError::code(ErrorCode::ServiceBusy));
        }
    };

    // 3. 写入本地消息表（Outbox Pattern）；失败回补缓存
    let topic = &state.config.kafka.topic;
    let outbox_msg = match db::outbox::create(&state.pool, topic, &payload).await {
        Ok(outbox_msg) => outbox_msg,
        Err(e) => {
            tracing::error!(order_num, error = %e, "Outbox insert failed");
            scripts::rollback_reservation(&mut conn, product_id, user_id).await;
            return Err(ServiceError::code(ErrorCode::ServiceBusy));
        }
    };

    // 4. 预写 pending 状态，便于前端轮询（尽力而为）
    let entry = PendingOrder {
        order_num: order_num.clone(),
        order_id: None,
        payment_id: payment_id.clone(),
        product_id: Some(product_id),
        user_id: Some(user_id),
        price_cents: Some(price_cents),
        status: PendingStatus::Pending,
        message: None,
    };
    if let Err(e) = pending::set(&mut conn, &entry).await {
        tracing::warn!(order_num, error = %e, "Failed to seed pending cache");
    }

    // 5. 即时转发（失败由补偿任务处理）+ 详情缓存失效
    OutboxDispatcher::spawn_forward(state.pool.clone(), state.producer.clone(), outbox_msg);
    state.cache_workers.invalidate_product_info(product_id);

    Ok(SeckillResult {
        order_num,
        payment_id,
        status: PendingStatus::Pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serde_round_trip() {
        let msg = SeckillMessage {
            user_id: 42,
            product_id: 7,
            order_num: "1001".into(),
            payment_id: "2001".into(),
            price_cents: 19900,
            time: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: SeckillMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, 42);
        assert_eq!(back.order_num, "1001");
        assert_eq!(back.price_cents, 19900);
    }
}

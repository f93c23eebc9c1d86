//! 订单物化服务
//!
//! 消费秒杀队列，整批一个事务落库：
//! 幂等过滤 → 按商品分组批量扣库存 → 批量插入订单/支付单。
//! 提交后 pipeline 改写 pending 终态并触发缓存刷新；事务失败则
//! 回补整批消息的 Redis 预占并向消费者返回错误（offset 不提交）。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use shared::error::AppError;
use shared::models::{Order, Payment};

use super::seckill::SeckillMessage;
use crate::broker::BatchHandler;
use crate::cache::pending::{self, PendingOrder};
use crate::cache::{scripts, CacheWorkers};
use crate::core::{ServiceError, ServiceResult};
use crate::db;
use crate::db::order::NewOrder;
use crate::db::payment::NewPayment;
use crate::utils::IdGenerator;

/// 批量插入分片大小
const INSERT_CHUNK: usize = 500;

/// 批量处理结果记录
struct OrderResult {
    order_num: String,
    order_id: i64,
    payment_id: String,
    success: bool,
    err_msg: String,
}

impl OrderResult {
    fn ready(order_num: String, order_id: i64, payment_id: String) -> Self {
        Self {
            order_num,
            order_id,
            payment_id,
            success: true,
            err_msg: String::new(),
        }
    }

    fn failed(order_num: String, err_msg: impl Into<String>) -> Self {
        Self {
            order_num,
            order_id: 0,
            payment_id: String::new(),
            success: false,
            err_msg: err_msg.into(),
        }
    }
}

/// 订单物化服务
pub struct Materializer {
    pool: PgPool,
    redis: ConnectionManager,
    cache_workers: CacheWorkers,
    ids: Arc<IdGenerator>,
}

impl Materializer {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        cache_workers: CacheWorkers,
        ids: Arc<IdGenerator>,
    ) -> Self {
        Self {
            pool,
            redis,
            cache_workers,
            ids,
        }
    }

    /// 解析 → 事务落库 → 终态发布；整体失败时回补缓存并抛错重试
    async fn run_batch(&self, payloads: Vec<Vec<u8>>) -> ServiceResult<()> {
        // 1. 解析所有消息，丢弃畸形的
        let mut msgs: Vec<SeckillMessage> = Vec::with_capacity(payloads.len());
        for body in &payloads {
            match serde_json::from_slice::<SeckillMessage>(body) {
                Ok(msg) if !msg.order_num.is_empty() => msgs.push(msg),
                Ok(_) => tracing::warn!("Seckill message without order_num, skipping"),
                Err(e) => tracing::warn!(error = %e, "Malformed seckill message, skipping"),
            }
        }
        if msgs.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        let mut results: Vec<OrderResult> = Vec::with_capacity(msgs.len());
        let mut product_stocks: HashMap<i64, i32> = HashMap::new();

        let outcome = self
            .materialize(&msgs, &mut results, &mut product_stocks)
            .await;

        let mut conn = self.redis.clone();
        match outcome {
            Ok(()) => {
                let entries: Vec<PendingOrder> = results
                    .iter()
                    .map(|r| {
                        if r.success {
                            PendingOrder::ready(r.order_num.clone(), r.order_id, r.payment_id.clone())
                        } else {
                            PendingOrder::failed(r.order_num.clone(), r.err_msg.clone())
                        }
                    })
                    .collect();
                if let Err(e) = pending::publish_batch(&mut conn, &entries).await {
                    tracing::warn!(error = %e, "Pending status batch publish failed");
                }

                for (&product_id, &stock) in &product_stocks {
                    self.cache_workers.refresh_stock(product_id, stock as i64);
                    self.cache_workers.invalidate_product_info(product_id);
                }

                let success = results.iter().filter(|r| r.success).count();
                tracing::info!(
                    total = msgs.len(),
                    success,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Batch materialized"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Batch transaction failed, rolling back reservations");
                // 事务失败：回补整批消息的 Redis 预占，标记 pending 失败
                for msg in &msgs {
                    scripts::rollback_reservation(&mut conn, msg.product_id, msg.user_id).await;
                    pending::mark_failed(&mut conn, &msg.order_num, "内部错误，稍后重试").await;
                }
                Err(e)
            }
        }
    }

    /// 一个事务内完成幂等过滤、扣库存与批量插入
    async fn materialize(
        &self,
        msgs: &[SeckillMessage],
        results: &mut Vec<OrderResult>,
        product_stocks: &mut HashMap<i64, i32>,
    ) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;

        // 幂等过滤：按 order_num 查询已存在的订单
        let order_nums: Vec<String> = msgs.iter().map(|m| m.order_num.clone()).collect();
        let existing = db::order::get_by_order_nums(&mut *tx, &order_nums).await?;
        let existing_ids: Vec<i64> = existing.iter().map(|o| o.id).collect();
        let existing_payments = db::payment::get_by_order_ids(&mut *tx, &existing_ids).await?;

        let payment_by_order: HashMap<i64, Payment> = existing_payments
            .into_iter()
            .map(|p| (p.order_id, p))
            .collect();
        let existing_by_num: HashMap<String, Order> = existing
            .into_iter()
            .map(|o| (o.order_num.clone(), o))
            .collect();

        let mut work: Vec<&SeckillMessage> = Vec::with_capacity(msgs.len());
        for msg in msgs {
            match existing_by_num.get(&msg.order_num) {
                Some(order) => {
                    // 已存在，用库里的支付单直接记成功
                    let payment_id = payment_by_order
                        .get(&order.id)
                        .map(|p| p.payment_id.clone())
                        .unwrap_or_else(|| msg.payment_id.clone());
                    results.push(OrderResult::ready(
                        order.order_num.clone(),
                        order.id,
                        payment_id,
                    ));
                }
                None => work.push(msg),
            }
        }
        if work.is_empty() {
            tx.commit().await?;
            tracing::info!("All orders in batch already exist");
            return Ok(());
        }

        // 按商品分组统计扣库存数量
        let mut deductions: HashMap<i64, i32> = HashMap::new();
        for msg in &work {
            *deductions.entry(msg.product_id).or_insert(0) += 1;
        }

        // 批量扣减库存；rows = 0 代表该商品整组库存不足
        let mut sold_out: HashSet<i64> = HashSet::new();
        for (&product_id, &count) in &deductions {
            let rows = db::product::debit_stock(&mut *tx, product_id, count).await?;
            if rows == 0 {
                sold_out.insert(product_id);
                for msg in work.iter().filter(|m| m.product_id == product_id) {
                    results.push(OrderResult::failed(msg.order_num.clone(), "库存不足"));
                }
                continue;
            }
            // 记录扣减后的库存用于缓存刷新
            if let Some(stock) = db::product::get_stock(&mut *tx, product_id).await? {
                product_stocks.insert(product_id, stock);
            }
        }
        work.retain(|m| !sold_out.contains(&m.product_id));
        if work.is_empty() {
            tx.commit().await?;
            return Ok(());
        }

        // 批量插入订单
        let new_orders: Vec<NewOrder> = work
            .iter()
            .map(|m| NewOrder {
                user_id: m.user_id,
                product_id: m.product_id,
                order_num: m.order_num.clone(),
            })
            .collect();
        let mut order_by_num: HashMap<String, Order> = HashMap::with_capacity(new_orders.len());
        for chunk in new_orders.chunks(INSERT_CHUNK) {
            for order in db::order::bulk_insert(&mut *tx, chunk).await? {
                order_by_num.insert(order.order_num.clone(), order);
            }
        }

        // 批量插入支付单；金额缺失时按商品价兜底
        let mut new_payments: Vec<NewPayment> = Vec::with_capacity(work.len());
        for msg in &work {
            let order = order_by_num
                .get(&msg.order_num)
                .ok_or_else(|| AppError::internal("inserted order missing from returning set"))?;
            let payment_id = if msg.payment_id.is_empty() {
                self.ids.next_string()
            } else {
                msg.payment_id.clone()
            };
            let amount_cents = if msg.price_cents > 0 {
                msg.price_cents
            } else {
                db::product::get_by_id(&mut *tx, msg.product_id)
                    .await?
                    .map(|p| p.price_cents)
                    .ok_or_else(|| AppError::internal("product missing while pricing payment"))?
            };
            new_payments.push(NewPayment {
                order_id: order.id,
                payment_id,
                amount_cents,
            });
        }
        let mut payment_id_by_order: HashMap<i64, String> =
            HashMap::with_capacity(new_payments.len());
        for chunk in new_payments.chunks(INSERT_CHUNK) {
            for payment in db::payment::bulk_insert(&mut *tx, chunk).await? {
                payment_id_by_order.insert(payment.order_id, payment.payment_id);
            }
        }

        for msg in &work {
            let order = &order_by_num[&msg.order_num];
            let payment_id = payment_id_by_order
                .get(&order.id)
                .cloned()
                .unwrap_or_default();
            results.push(OrderResult::ready(
                order.order_num.clone(),
                order.id,
                payment_id,
            ));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BatchHandler for Materializer {
    async fn process_batch(&self, payloads: Vec<Vec<u8>>) -> Result<(), ServiceError> {
        self.run_batch(payloads).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(order_num: &str, product_id: i64, user_id: i64) -> SeckillMessage {
        SeckillMessage {
            user_id,
            product_id,
            order_num: order_num.into(),
            payment_id: format!("p-{order_num}"),
            price_cents: 100,
            time: Utc::now(),
        }
    }

    #[test]
    fn test_deduction_grouping() {
        let msgs = [msg("1", 7, 1), msg("2", 7, 2), msg("3", 9, 3)];
        let mut deductions: HashMap<i64, i32> = HashMap::new();
        for m in &msgs {
            *deductions.entry(m.product_id).or_insert(0) += 1;
        }
        assert_eq!(deductions[&7], 2);
        assert_eq!(deductions[&9], 1);
    }

    #[test]
    fn test_malformed_messages_are_dropped() {
        let payloads: Vec<Vec<u8>> = vec![
            b"not json".to_vec(),
            serde_json::to_vec(&msg("1", 7, 1)).unwrap(),
            br#"{"user_id":1}"#.to_vec(),
        ];
        let parsed: Vec<SeckillMessage> = payloads
            .iter()
            .filter_map(|b| serde_json::from_slice::<SeckillMessage>(b).ok())
            .filter(|m| !m.order_num.is_empty())
            .collect();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].order_num, "1");
    }

    #[test]
    fn test_order_result_terminal_shapes() {
        let ok = OrderResult::ready("1".into(), 5, "p-1".into());
        assert!(ok.success);
        let bad = OrderResult::failed("2".into(), "库存不足");
        assert!(!bad.success);
        assert_eq!(bad.err_msg, "库存不足");
    }
}

//! 缓存一致性 worker pool
//!
//! 两组固定大小的 worker，各自消费一条有界 channel：
//! - 失效池：删除 `product:info:{id}`，DashMap 去重合并同 ID 任务
//! - 库存刷新池：`id → 最新库存` 覆盖表，worker 取走即删，最新值总是赢
//!
//! 入队非阻塞：channel 满则清掉标记直接丢弃。两类操作都幂等且
//! 状态收敛，下一个事件会重新入队。

use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::{keys, scripts};

/// 每个池的 worker 数量
const WORKER_COUNT: usize = 10;
/// channel 缓冲大小
const TASK_CHAN_SIZE: usize = 10_000;

/// 缓存一致性 worker 句柄，克隆廉价
#[derive(Clone)]
pub struct CacheWorkers {
    invalidate_tx: mpsc::Sender<i64>,
    /// 去重：正在处理或待处理的 productID
    pending_invalidate: Arc<DashMap<i64, ()>>,
    refresh_tx: mpsc::Sender<i64>,
    /// 每个 productID 最新的库存值
    pending_refresh: Arc<DashMap<i64, i64>>,
}

impl CacheWorkers {
    /// 启动两组 worker pool
    pub fn spawn(redis: ConnectionManager) -> Self {
        let (invalidate_tx, invalidate_rx) = mpsc::channel::<i64>(TASK_CHAN_SIZE);
        let (refresh_tx, refresh_rx) = mpsc::channel::<i64>(TASK_CHAN_SIZE);

        let pending_invalidate: Arc<DashMap<i64, ()>> = Arc::new(DashMap::new());
        let pending_refresh: Arc<DashMap<i64, i64>> = Arc::new(DashMap::new());

        let invalidate_rx = Arc::new(Mutex::new(invalidate_rx));
        let refresh_rx = Arc::new(Mutex::new(refresh_rx));

        for _ in 0..WORKER_COUNT {
            let rx = invalidate_rx.clone();
            let pending = pending_invalidate.clone();
            let mut conn = redis.clone();
            tokio::spawn(async move {
                loop {
                    let product_id = {
                        let mut rx = rx.lock().await;
                        match rx.recv().await {
                            Some(id) => id,
                            None => break,
                        }
                    };
                    if let Err(e) = conn
                        .del::<_, i64>(keys::info_key(product_id))
                        .await
                    {
                        tracing::warn!(product_id, error = %e, "Product info invalidation failed");
                    }
                    // 删除完成，允许后续同 ID 任务进入
                    pending.remove(&product_id);
                }
            });

            let rx = refresh_rx.clone();
            let pending = pending_refresh.clone();
            let mut conn = redis.clone();
            tokio::spawn(async move {
                loop {
                    let product_id = {
                        let mut rx = rx.lock().await;
                        match rx.recv().await {
                            Some(id) => id,
                            None => break,
                        }
                    };
                    // 取出最新的库存值
                    let Some((_, stock)) = pending.remove(&product_id) else {
                        continue;
                    };
                    if let Err(e) = scripts::set_stock(&mut conn, product_id, stock).await {
                        tracing::warn!(product_id, stock, error = %e, "Stock cache refresh failed");
                    }
                }
            });
        }

        Self {
            invalidate_tx,
            pending_invalidate,
            refresh_tx,
            pending_refresh,
        }
    }

    /// 异步失效商品详情缓存，同 ID 任务合并
    pub fn invalidate_product_info(&self, product_id: i64) {
        // 去重：已在队列中则跳过
        if self.pending_invalidate.insert(product_id, ()).is_some() {
            return;
        }
        if self.invalidate_tx.try_send(product_id).is_err() {
            // 没进队列，清除标记
            self.pending_invalidate.remove(&product_id);
        }
    }

    /// 异步刷新库存缓存，最新值覆盖
    pub fn refresh_stock(&self, product_id: i64, stock: i64) {
        // 覆盖旧值；已在队列中则不重复发送
        if self.pending_refresh.insert(product_id, stock).is_some() {
            return;
        }
        if self.refresh_tx.try_send(product_id).is_err() {
            self.pending_refresh.remove(&product_id);
        }
    }
}

//! 商品详情缓存（single-flight）
//!
//! 并发 miss 合并为一次 DB 读：每个商品一把异步锁，拿锁后二次检查。
//! 防穿透：不存在的 ID 写 `"null"` 哨兵，TTL 5 分钟。
//! 防雪崩：正常详情 TTL 3600 + rand(0, 1800) 秒抖动。
//! 返回前用 `product:stock:{id}` 覆盖 stock 字段，详情页不展示陈旧库存。

use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::keys;
use crate::core::ServiceResult;
use crate::db;
use shared::models::Product;

/// 防穿透哨兵值
const NULL_SENTINEL: &str = "null";
/// 哨兵 TTL（秒）
const NULL_TTL_SECS: u64 = 300;
/// 详情基础 TTL（秒）
const INFO_TTL_SECS: u64 = 3600;
/// TTL 抖动上限（秒）
const INFO_TTL_JITTER_SECS: u64 = 1800;

/// 商品详情缓存读取器
#[derive(Clone, Default)]
pub struct ProductCache {
    inflight: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl ProductCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取商品详情，缓存未命中时回源数据库
    pub async fn get(
        &self,
        conn: &mut ConnectionManager,
        pool: &PgPool,
        product_id: i64,
    ) -> ServiceResult<Option<Product>> {
        if let Some(hit) = self.read_cache(conn, product_id).await? {
            return Ok(hit);
        }

        // miss：single-flight，拿到锁的协程回源，其余等待后读缓存
        let lock = self
            .inflight
            .entry(product_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // 二次检查：前一个持锁者可能已经填好缓存
        if let Some(hit) = self.read_cache(conn, product_id).await? {
            self.inflight.remove(&product_id);
            return Ok(hit);
        }

        let product = db::product::get_by_id(pool, product_id).await?;
        match &product {
            Some(p) => {
                let json = serde_json::to_string(p)?;
                let ttl = INFO_TTL_SECS + jitter(INFO_TTL_JITTER_SECS);
                conn.set_ex::<_, _, ()>(keys::info_key(product_id), json, ttl)
                    .await?;
            }
            None => {
                conn.set_ex::<_, _, ()>(keys::info_key(product_id), NULL_SENTINEL, NULL_TTL_SECS)
                    .await?;
            }
        }
        self.inflight.remove(&product_id);

        match product {
            Some(p) => Ok(Some(self.overlay_stock(conn, p).await)),
            None => Ok(None),
        }
    }

    /// 读缓存；命中哨兵返回 Some(None)，未命中返回 None
    async fn read_cache(
        &self,
        conn: &mut ConnectionManager,
        product_id: i64,
    ) -> ServiceResult<Option<Option<Product>>> {
        let raw: Option<String> = conn.get(keys::info_key(product_id)).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        if raw == NULL_SENTINEL {
            return Ok(Some(None));
        }
        match serde_json::from_str::<Product>(&raw) {
            Ok(p) => Ok(Some(Some(self.overlay_stock(conn, p).await))),
            Err(e) => {
                // 缓存损坏按 miss 处理，回源覆盖
                tracing::warn!(product_id, error = %e, "Corrupt product info cache entry");
                Ok(None)
            }
        }
    }

    /// 用库存计数器覆盖 stock 字段
    async fn overlay_stock(&self, conn: &mut ConnectionManager, mut product: Product) -> Product {
        match conn.get::<_, Option<i64>>(keys::stock_key(product.id)).await {
            Ok(Some(stock)) => product.stock = stock.max(0) as i32,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(product_id = product.id, error = %e, "Stock counter read failed");
            }
        }
        product
    }
}

fn jitter(max_secs: u64) -> u64 {
    use rand::Rng;
    rand::thread_rng().gen_range(0..max_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_in_range() {
        for _ in 0..100 {
            let j = jitter(INFO_TTL_JITTER_SECS);
            assert!(j < INFO_TTL_JITTER_SECS);
        }
    }
}

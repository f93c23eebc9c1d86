//! 数据访问层
//!
//! 每张表一个模块，函数直接接收执行器（连接池或事务），遵循
//! 「仓储即普通异步函数」的风格。

pub mod coupon;
pub mod order;
pub mod outbox;
pub mod paid_vip;
pub mod payment;
pub mod product;
pub mod user;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::core::config::DatabaseConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 建立连接池并执行迁移
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, BoxError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

//! 付费 VIP 表操作

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use shared::models::PaidVip;

pub async fn get_by_user(
    exec: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Option<PaidVip>, sqlx::Error> {
    sqlx::query_as::<_, PaidVip>("SELECT * FROM paid_vips WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(exec)
        .await
}

/// 开通/续费：一人一行，重复购买覆盖等级与有效期
pub async fn upsert(
    exec: impl PgExecutor<'_>,
    user_id: i64,
    level: i32,
    started_at: DateTime<Utc>,
    expired_at: DateTime<Utc>,
) -> Result<PaidVip, sqlx::Error> {
    sqlx::query_as::<_, PaidVip>(
        "INSERT INTO paid_vips (user_id, level, started_at, expired_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id) DO UPDATE SET
             level      = EXCLUDED.level,
             started_at = EXCLUDED.started_at,
             expired_at = EXCLUDED.expired_at
         RETURNING *",
    )
    .bind(user_id)
    .bind(level)
    .bind(started_at)
    .bind(expired_at)
    .fetch_one(exec)
    .await
}

/// 查询仍在有效期内的付费 VIP（月度发券）
pub async fn list_active(
    exec: impl PgExecutor<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<PaidVip>, sqlx::Error> {
    sqlx::query_as::<_, PaidVip>("SELECT * FROM paid_vips WHERE expired_at > $1")
        .bind(now)
        .fetch_all(exec)
        .await
}

//! 优惠券模板与用户券表操作

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use shared::models::{Coupon, CouponKind, UserCoupon, UserCouponStatus};

// ── 模板 ──

pub async fn get_template(
    exec: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn list_templates_by_ids(
    exec: impl PgExecutor<'_>,
    ids: &[i64],
) -> Result<Vec<Coupon>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(exec)
        .await
}

/// 模板创建参数（VIP 月度券模板按 title 幂等）
#[derive(Debug, Clone)]
pub struct TemplateSpec {
    pub kind: CouponKind,
    pub title: String,
    pub amount_cents: i64,
    pub discount_rate: i32,
    pub min_spend_cents: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

/// 按 title 取或建模板（并发安全：唯一键 + DO UPDATE 返回行）
pub async fn get_or_create_template(
    exec: impl PgExecutor<'_>,
    spec: &TemplateSpec,
) -> Result<Coupon, sqlx::Error> {
    sqlx::query_as::<_, Coupon>(
        "INSERT INTO coupons (kind, title, amount_cents, discount_rate, min_spend_cents,
                              valid_from, valid_to, purchasable)
         VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
         ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title
         RETURNING *",
    )
    .bind(spec.kind)
    .bind(&spec.title)
    .bind(spec.amount_cents)
    .bind(spec.discount_rate)
    .bind(spec.min_spend_cents)
    .bind(spec.valid_from)
    .bind(spec.valid_to)
    .fetch_one(exec)
    .await
}

// ── 用户券 ──

/// 行锁读取用户券（apply 路径）
pub async fn get_user_coupon_for_update(
    exec: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<UserCoupon>, sqlx::Error> {
    sqlx::query_as::<_, UserCoupon>("SELECT * FROM user_coupons WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// 核销：置 used 并绑定订单
pub async fn mark_used(
    exec: impl PgExecutor<'_>,
    user_coupon_id: i64,
    order_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE user_coupons SET status = 'used', order_id = $2
         WHERE id = $1 AND status = 'available'",
    )
    .bind(user_coupon_id)
    .bind(order_id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

/// 释放绑定到订单的券（仅影响 used 且绑定该订单的行）
pub async fn release_by_order(
    exec: impl PgExecutor<'_>,
    order_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE user_coupons SET status = 'available', order_id = NULL
         WHERE order_id = $1 AND status = 'used'",
    )
    .bind(order_id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

/// 查询绑定到订单的券
pub async fn get_bound_to_order(
    exec: impl PgExecutor<'_>,
    order_id: i64,
) -> Result<Option<UserCoupon>, sqlx::Error> {
    sqlx::query_as::<_, UserCoupon>(
        "SELECT * FROM user_coupons WHERE order_id = $1 AND status = 'used'",
    )
    .bind(order_id)
    .fetch_optional(exec)
    .await
}

/// 统计某来源在时间窗口内的发放数（月度配额幂等）
pub async fn count_by_period(
    exec: impl PgExecutor<'_>,
    user_id: i64,
    obtained_from: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_coupons
         WHERE user_id = $1 AND obtained_from = $2
           AND valid_from >= $3 AND valid_from < $4",
    )
    .bind(user_id)
    .bind(obtained_from)
    .bind(from)
    .bind(to)
    .fetch_one(exec)
    .await
}

/// 新用户券参数
#[derive(Debug, Clone)]
pub struct NewUserCoupon {
    pub user_id: i64,
    pub coupon_id: i64,
    pub obtained_from: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

pub async fn create_user_coupon(
    exec: impl PgExecutor<'_>,
    row: &NewUserCoupon,
) -> Result<UserCoupon, sqlx::Error> {
    sqlx::query_as::<_, UserCoupon>(
        "INSERT INTO user_coupons (user_id, coupon_id, obtained_from, valid_from, valid_to)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(row.user_id)
    .bind(row.coupon_id)
    .bind(&row.obtained_from)
    .bind(row.valid_from)
    .bind(row.valid_to)
    .fetch_one(exec)
    .await
}

/// UNNEST 批量发券
pub async fn batch_create_user_coupons(
    exec: impl PgExecutor<'_>,
    rows: &[NewUserCoupon],
) -> Result<u64, sqlx::Error> {
    if rows.is_empty() {
        return Ok(0);
    }
    let user_ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
    let coupon_ids: Vec<i64> = rows.iter().map(|r| r.coupon_id).collect();
    let sources: Vec<String> = rows.iter().map(|r| r.obtained_from.clone()).collect();
    let valid_froms: Vec<DateTime<Utc>> = rows.iter().map(|r| r.valid_from).collect();
    let valid_tos: Vec<DateTime<Utc>> = rows.iter().map(|r| r.valid_to).collect();

    let result = sqlx::query(
        "INSERT INTO user_coupons (user_id, coupon_id, obtained_from, valid_from, valid_to)
         SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::varchar[],
                              $4::timestamptz[], $5::timestamptz[])",
    )
    .bind(&user_ids)
    .bind(&coupon_ids)
    .bind(&sources)
    .bind(&valid_froms)
    .bind(&valid_tos)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

/// 分页查询用户券，可按状态过滤
pub async fn list_by_user(
    pool: &sqlx::PgPool,
    user_id: i64,
    status: Option<UserCouponStatus>,
    page: i64,
    page_size: i64,
) -> Result<(Vec<UserCoupon>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_coupons
         WHERE user_id = $1 AND ($2::user_coupon_status IS NULL OR status = $2)",
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    let coupons = sqlx::query_as::<_, UserCoupon>(
        "SELECT * FROM user_coupons
         WHERE user_id = $1 AND ($2::user_coupon_status IS NULL OR status = $2)
         ORDER BY id DESC LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(status)
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(pool)
    .await?;

    Ok((coupons, total))
}

/// 批量将过期但仍 available 的券标记为 expired
pub async fn mark_expired_batch(
    exec: impl PgExecutor<'_>,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE user_coupons SET status = 'expired'
         WHERE status = 'available' AND valid_to < $1",
    )
    .bind(now)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

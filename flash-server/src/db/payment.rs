//! 支付表操作

use sqlx::PgExecutor;

use shared::models::{Payment, PaymentStatus};

/// 批量插入用的新支付行
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub payment_id: String,
    pub amount_cents: i64,
}

/// UNNEST 批量插入支付单（status = pending）
pub async fn bulk_insert(
    exec: impl PgExecutor<'_>,
    rows: &[NewPayment],
) -> Result<Vec<Payment>, sqlx::Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<i64> = rows.iter().map(|r| r.order_id).collect();
    let payment_ids: Vec<String> = rows.iter().map(|r| r.payment_id.clone()).collect();
    let amounts: Vec<i64> = rows.iter().map(|r| r.amount_cents).collect();

    sqlx::query_as::<_, Payment>(
        "INSERT INTO payments (order_id, payment_id, amount_cents)
         SELECT * FROM UNNEST($1::bigint[], $2::varchar[], $3::bigint[])
         RETURNING *",
    )
    .bind(&order_ids)
    .bind(&payment_ids)
    .bind(&amounts)
    .fetch_all(exec)
    .await
}

/// 根据支付号查支付单
pub async fn get_by_payment_id(
    exec: impl PgExecutor<'_>,
    payment_id: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(exec)
        .await
}

/// 根据订单 ID 查支付单（单订单唯一支付单）
pub async fn get_by_order_id(
    exec: impl PgExecutor<'_>,
    order_id: i64,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(exec)
        .await
}

/// 按订单 ID 批量查支付单
pub async fn get_by_order_ids(
    exec: impl PgExecutor<'_>,
    order_ids: &[i64],
) -> Result<Vec<Payment>, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = ANY($1)")
        .bind(order_ids)
        .fetch_all(exec)
        .await
}

/// 条件更新支付状态（仅 pending 可迁移），用于回调幂等；返回受影响行数
pub async fn set_status_if_pending(
    exec: impl PgExecutor<'_>,
    payment_id: &str,
    to: PaymentStatus,
    notify_data: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET
             status      = $2,
             notify_data = CASE WHEN $3 = '' THEN notify_data ELSE $3 END,
             updated_at  = now()
         WHERE payment_id = $1 AND status = 'pending'",
    )
    .bind(payment_id)
    .bind(to)
    .bind(notify_data)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

/// 改写 pending 支付单金额（换券重算），返回受影响行数
pub async fn set_amount_if_pending(
    exec: impl PgExecutor<'_>,
    order_id: i64,
    amount_cents: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET amount_cents = $2, updated_at = now()
         WHERE order_id = $1 AND status = 'pending'",
    )
    .bind(order_id)
    .bind(amount_cents)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

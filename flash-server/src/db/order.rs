//! 订单表操作

use sqlx::PgExecutor;

use shared::models::{Order, OrderStatus};

/// 批量插入用的新订单行
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub product_id: i64,
    pub order_num: String,
}

/// 按订单号批量查询（物化幂等过滤）
pub async fn get_by_order_nums(
    exec: impl PgExecutor<'_>,
    order_nums: &[String],
) -> Result<Vec<Order>, sqlx::Error> {
    if order_nums.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_num = ANY($1)")
        .bind(order_nums)
        .fetch_all(exec)
        .await
}

/// UNNEST 批量插入订单（status = unpaid），返回插入的行
pub async fn bulk_insert(
    exec: impl PgExecutor<'_>,
    rows: &[NewOrder],
) -> Result<Vec<Order>, sqlx::Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let user_ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
    let product_ids: Vec<i64> = rows.iter().map(|r| r.product_id).collect();
    let order_nums: Vec<String> = rows.iter().map(|r| r.order_num.clone()).collect();

    sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, product_id, order_num)
         SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::varchar[])
         RETURNING *",
    )
    .bind(&user_ids)
    .bind(&product_ids)
    .bind(&order_nums)
    .fetch_all(exec)
    .await
}

/// 按 ID 查询
pub async fn get_by_id(exec: impl PgExecutor<'_>, id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// 按订单号查询
pub async fn get_by_order_num(
    exec: impl PgExecutor<'_>,
    order_num: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_num = $1")
        .bind(order_num)
        .fetch_optional(exec)
        .await
}

/// 分页查询用户订单，可按状态过滤
pub async fn list_by_user(
    pool: &sqlx::PgPool,
    user_id: i64,
    status: Option<OrderStatus>,
    page: i64,
    page_size: i64,
) -> Result<(Vec<Order>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders
         WHERE user_id = $1 AND ($2::smallint IS NULL OR status = $2)",
    )
    .bind(user_id)
    .bind(status.map(|s| s as i16))
    .fetch_one(pool)
    .await?;

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders
         WHERE user_id = $1 AND ($2::smallint IS NULL OR status = $2)
         ORDER BY id DESC LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(status.map(|s| s as i16))
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(pool)
    .await?;

    Ok((orders, total))
}

/// 条件状态迁移（回调幂等），返回受影响行数
pub async fn set_status_if(
    exec: impl PgExecutor<'_>,
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = $3, updated_at = now()
         WHERE id = $1 AND status = $2",
    )
    .bind(order_id)
    .bind(from as i16)
    .bind(to as i16)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

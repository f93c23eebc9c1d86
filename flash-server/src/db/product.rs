//! 商品表操作

use sqlx::PgExecutor;

use shared::models::{Product, ProductCreate, ProductUpdate};

/// 按 ID 查询商品（软删除的不可见）
pub async fn get_by_id(
    exec: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(exec)
    .await
}

/// 分页查询商品列表，按 id 倒序
pub async fn list(
    pool: &sqlx::PgPool,
    page: i64,
    page_size: i64,
) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
            .fetch_one(pool)
            .await?;

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE deleted_at IS NULL
         ORDER BY id DESC LIMIT $1 OFFSET $2",
    )
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(pool)
    .await?;

    Ok((products, total))
}

/// 查询指定用户创建的商品
pub async fn list_by_owner(
    pool: &sqlx::PgPool,
    owner_id: i64,
    page: i64,
    page_size: i64,
) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products WHERE owner_id = $1 AND deleted_at IS NULL",
    )
    .bind(owner_id)
    .fetch_one(pool)
    .await?;

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE owner_id = $1 AND deleted_at IS NULL
         ORDER BY id DESC LIMIT $2 OFFSET $3",
    )
    .bind(owner_id)
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(pool)
    .await?;

    Ok((products, total))
}

/// 插入新商品
pub async fn create(
    exec: impl PgExecutor<'_>,
    owner_id: i64,
    payload: &ProductCreate,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (owner_id, name, price_cents, stock, start_time, end_time, image_url)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(owner_id)
    .bind(&payload.name)
    .bind(payload.price_cents)
    .bind(payload.stock)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.image_url.as_deref().unwrap_or(""))
    .fetch_one(exec)
    .await
}

/// 限定创建者更新商品，返回更新后的行（不存在/越权返回 None）
pub async fn update_by_owner(
    exec: impl PgExecutor<'_>,
    id: i64,
    owner_id: i64,
    payload: &ProductUpdate,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET
             name        = COALESCE($3, name),
             price_cents = COALESCE($4, price_cents),
             stock       = COALESCE($5, stock),
             start_time  = COALESCE($6, start_time),
             end_time    = COALESCE($7, end_time),
             image_url   = COALESCE($8, image_url),
             updated_at  = now()
         WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL
         RETURNING *",
    )
    .bind(id)
    .bind(owner_id)
    .bind(payload.name.as_deref())
    .bind(payload.price_cents)
    .bind(payload.stock)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.image_url.as_deref())
    .fetch_optional(exec)
    .await
}

/// 软删除商品，返回受影响行数
pub async fn soft_delete(
    exec: impl PgExecutor<'_>,
    id: i64,
    owner_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET deleted_at = now()
         WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(owner_id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

/// 批量扣减库存，剩余库存 >= count 时才扣；返回受影响行数
pub async fn debit_stock(
    exec: impl PgExecutor<'_>,
    product_id: i64,
    count: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - $2, updated_at = now()
         WHERE id = $1 AND stock >= $2",
    )
    .bind(product_id)
    .bind(count)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

/// 读取当前库存
pub async fn get_stock(
    exec: impl PgExecutor<'_>,
    product_id: i64,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(exec)
        .await
}

//! 用户表操作

use sqlx::PgExecutor;

use shared::models::User;

/// 插入用户，用户名唯一键冲突由调用方识别处理
pub async fn create(
    exec: impl PgExecutor<'_>,
    username: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING *",
    )
    .bind(username)
    .bind(password_hash)
    .fetch_one(exec)
    .await
}

pub async fn get_by_id(exec: impl PgExecutor<'_>, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn get_by_username(
    exec: impl PgExecutor<'_>,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(exec)
        .await
}

/// 行锁读取（成长等级累计前调用，串行化同一用户的并发回调）
pub async fn get_by_id_for_update(
    exec: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// 累计实付金额并写入重算后的成长等级
pub async fn add_spend(
    exec: impl PgExecutor<'_>,
    id: i64,
    amount_cents: i64,
    growth_level: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
             total_spent_cents = total_spent_cents + $2,
             growth_level      = $3,
             updated_at        = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(amount_cents)
    .bind(growth_level)
    .execute(exec)
    .await?;
    Ok(())
}

/// 更新用户名/头像
pub async fn update_profile(
    exec: impl PgExecutor<'_>,
    id: i64,
    username: Option<&str>,
    avatar: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
             username   = COALESCE($2, username),
             avatar     = COALESCE($3, avatar),
             updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(username)
    .bind(avatar)
    .fetch_optional(exec)
    .await
}

/// 查询成长等级不低于阈值的用户（月度发券）
pub async fn list_with_growth_level(
    exec: impl PgExecutor<'_>,
    min_level: i32,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE growth_level >= $1")
        .bind(min_level)
        .fetch_all(exec)
        .await
}

//! 用户服务

use shared::error::ErrorCode;
use shared::models::User;
use sqlx::PgPool;

use crate::core::{AppState, ServiceError, ServiceResult};
use crate::db;
use crate::utils::password;

/// 注册用户，直接插入并依赖唯一键防重，密码哈希存储
pub async fn register(pool: &PgPool, username: &str, raw_password: &str) -> ServiceResult<User> {
    let hash = password::hash_password(raw_password)
        .map_err(|e| shared::AppError::internal(format!("password hash failed: {e}")))?;

    match db::user::create(pool, username, &hash).await {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(ServiceError::code(ErrorCode::UserExists)),
        Err(e) => Err(e.into()),
    }
}

/// 校验密码后签发 access/refresh 令牌对
pub async fn login(
    state: &AppState,
    username: &str,
    raw_password: &str,
) -> ServiceResult<(String, String)> {
    let user = db::user::get_by_username(&state.pool, username)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::UserNotFound))?;

    if !password::verify_password(raw_password, &user.password_hash) {
        return Err(ServiceError::code(ErrorCode::PasswordWrong));
    }

    state
        .jwt
        .generate_token_pair(user.id, &user.username)
        .map_err(|e| shared::AppError::internal(format!("token generation failed: {e}")).into())
}

/// 查询用户信息
pub async fn get_profile(pool: &PgPool, user_id: i64) -> ServiceResult<User> {
    db::user::get_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::UserNotFound))
}

/// 更新用户名或头像；用户名变更先查重
pub async fn update_profile(
    pool: &PgPool,
    user_id: i64,
    username: Option<&str>,
    avatar: Option<&str>,
) -> ServiceResult<User> {
    let current = get_profile(pool, user_id).await?;

    let new_username = match username {
        Some(name) if name != current.username => {
            if db::user::get_by_username(pool, name).await?.is_some() {
                return Err(ServiceError::code(ErrorCode::UserExists));
            }
            Some(name)
        }
        _ => None,
    };

    if new_username.is_none() && avatar.is_none() {
        return Ok(current);
    }

    db::user::update_profile(pool, user_id, new_username, avatar)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::UserNotFound))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

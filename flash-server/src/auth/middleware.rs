//! 认证中间件
//!
//! 从 `Authorization: Bearer <token>` 头提取并验证 JWT，验证成功后将
//! [`CurrentUser`] 注入请求扩展。

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use shared::error::AppError;

use super::jwt::{CurrentUser, JwtError, JwtService};
use crate::core::AppState;

/// 认证中间件 - 要求用户登录
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 Unauthorized |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => return Err(AppError::unauthorized()),
    };

    match state.jwt.validate_access(token) {
        Ok(claims) => {
            req.extensions_mut().insert(CurrentUser::from(claims));
            Ok(next.run(req).await)
        }
        Err(JwtError::ExpiredToken) => Err(AppError::token_expired()),
        Err(e) => {
            tracing::debug!(error = %e, "Token validation failed");
            Err(AppError::invalid_token("Invalid token"))
        }
    }
}

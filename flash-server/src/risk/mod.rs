//! 风控名单校验
//!
//! 黑名单命中直接拒绝（blocked），灰名单返回限流响应（limited）。
//! 名单存 Redis 集合，探测失败时放行。名单是建议性的，不应因
//! 缓存故障拒绝全部流量。

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::net::SocketAddr;

use shared::error::{AppError, ErrorCode};

use crate::auth::CurrentUser;
use crate::cache::keys;
use crate::core::AppState;

/// 提取客户端 IP：X-Forwarded-For 第一跳，回退对端地址
pub fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(val) = forwarded.to_str() {
            if let Some(first) = val.split(',').next() {
                let ip = first.trim();
                if !ip.is_empty() {
                    return ip.to_owned();
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

async fn in_set(conn: &mut ConnectionManager, set: &str, member: &str) -> bool {
    match conn.sismember::<_, _, bool>(set, member).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(set, error = %e, "Risk list probe failed, failing open");
            false
        }
    }
}

/// 黑/灰名单门禁
///
/// 全局挂载在认证之前，通常只有 IP 维度；请求扩展里已有
/// [`CurrentUser`] 时（门禁挂在认证内侧的部署）才探测用户名单。
pub async fn risk_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let mut conn = state.redis.clone();
    let ip = client_ip(&request);

    if in_set(&mut conn, keys::RISK_IP_BLACK, &ip).await {
        return Err(AppError::with_message(ErrorCode::RiskBlocked, "IP 被限制").into_response());
    }
    if in_set(&mut conn, keys::RISK_IP_GRAY, &ip).await {
        return Err(AppError::with_message(ErrorCode::RiskLimited, "灰名单限制").into_response());
    }

    if let Some(user) = request.extensions().get::<CurrentUser>() {
        let uid = user.user_id.to_string();
        if in_set(&mut conn, keys::RISK_USER_BLACK, &uid).await {
            return Err(
                AppError::with_message(ErrorCode::RiskBlocked, "账号被限制").into_response()
            );
        }
        if in_set(&mut conn, keys::RISK_USER_GRAY, &uid).await {
            return Err(
                AppError::with_message(ErrorCode::RiskLimited, "灰名单限制").into_response()
            );
        }
    }

    Ok(next.run(request).await)
}

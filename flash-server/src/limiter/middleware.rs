//! 双层限流中间件
//!
//! 第一层本地限流（额度 2 倍，快速拒绝），第二层 Redis 分布式限流
//! （精确全局额度）。路由维度与参数维度（product_id）各一套。

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use shared::error::{AppError, ErrorCode};

use super::distributed;
use crate::cache::keys;
use crate::core::config::RateLimit;
use crate::core::AppState;

/// 参数限流读 body 的上限
const BODY_LIMIT: usize = 64 * 1024;

fn rate_limited(msg: &str) -> Response {
    AppError::with_message(ErrorCode::TooManyRequests, msg).into_response()
}

/// 两级检查：本地桶（2 倍额度）→ Redis 桶（精确额度）
async fn check_two_stage(state: &AppState, purpose: &'static str, key: &str, limit: RateLimit) -> bool {
    let local = state
        .limiters
        .get_or_create(purpose, limit.rate * 2, limit.burst * 2);
    if !local.allow(key) {
        return false;
    }

    let mut conn = state.redis.clone();
    let redis_key = keys::rate_limit_key(purpose, key);
    distributed::allow(
        &mut conn,
        &redis_key,
        limit.rate,
        limit.burst,
        distributed::BUCKET_TTL_SECS,
    )
    .await
}

/// 路由级限流（按路由路径聚合）
async fn route_limit(
    state: &AppState,
    purpose: &'static str,
    limit: RateLimit,
    request: Request,
    next: Next,
    msg: &str,
) -> Result<Response, Response> {
    if limit.rate == 0 || limit.burst == 0 {
        return Ok(next.run(request).await);
    }
    let key = request.uri().path().to_owned();
    if !check_two_stage(state, purpose, &key, limit).await {
        return Err(rate_limited(msg));
    }
    Ok(next.run(request).await)
}

/// 登录接口限流
pub async fn login_limiter(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let limit = state.config.risk.login_rate;
    route_limit(&state, "login", limit, request, next, "登录过于频繁，请稍后再试").await
}

/// 秒杀接口限流
pub async fn seckill_limiter(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let limit = state.config.risk.seckill_rate;
    route_limit(&state, "seckill", limit, request, next, "秒杀过于频繁，请稍后再试").await
}

/// 支付回调限流
pub async fn pay_limiter(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let limit = state.config.risk.pay_rate;
    route_limit(&state, "pay", limit, request, next, "支付请求过于频繁").await
}

/// 热点商品限流：从 JSON body 提取 product_id，按商品维度限流
///
/// body 读出后原样放回，不影响后续 handler 反序列化。
pub async fn product_param_limiter(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let limit = state.config.risk.product_rate;
    if limit.rate == 0 || limit.burst == 0 {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return Err(AppError::invalid_params("request body too large").into_response());
        }
    };

    let product_id = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|v| v.get("product_id").and_then(|p| p.as_i64()));

    let request = Request::from_parts(parts, Body::from(bytes));

    if let Some(product_id) = product_id {
        let key = product_id.to_string();
        if !check_two_stage(&state, "hot:product", &key, limit).await {
            return Err(rate_limited("该商品访问过于频繁，请稍后再试"));
        }
    }

    Ok(next.run(request).await)
}

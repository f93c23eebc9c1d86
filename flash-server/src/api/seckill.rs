//! 秒杀接口

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use shared::ApiResponse;

use crate::auth::CurrentUser;
use crate::core::{AppState, ServiceError};
use crate::services;
use crate::services::seckill::SeckillResult;

#[derive(Debug, Deserialize)]
pub struct SeckillRequest {
    pub product_id: i64,
}

/// POST /seckill
///
/// 返回 pending 的订单号与支付号，前端用 `/orders/poll/{order_num}`
/// 轮询物化结果。
pub async fn seckill(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SeckillRequest>,
) -> Result<ApiResponse<SeckillResult>, ServiceError> {
    if req.product_id <= 0 {
        return Err(shared::AppError::invalid_params("product_id is required").into());
    }
    let result = services::seckill::reserve(&state, user.user_id, req.product_id).await?;
    Ok(ApiResponse::success(result))
}

//! 支付回调接口
//!
//! 网关签名在上游预校验，这里只做幂等状态机推进。

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use shared::models::{Order, Payment};
use shared::ApiResponse;

use crate::core::{AppState, ServiceError};
use crate::services;

#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub payment_id: String,
    /// paid | failed | refunded
    pub status: String,
    #[serde(default)]
    pub notify_data: String,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub order: Order,
    pub payment: Payment,
}

/// POST /payment/callback
pub async fn callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> Result<ApiResponse<CallbackResponse>, ServiceError> {
    if req.payment_id.is_empty() {
        return Err(shared::AppError::invalid_params("payment_id is required").into());
    }
    let (order, payment) =
        services::payment::handle_callback(&state, &req.payment_id, &req.status, &req.notify_data)
            .await?;
    Ok(ApiResponse::success(CallbackResponse { order, payment }))
}

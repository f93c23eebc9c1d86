//! VIP 接口

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use shared::ApiResponse;

use crate::auth::CurrentUser;
use crate::core::{AppState, ServiceError};
use crate::services;
use crate::services::vip::VipProfile;

/// GET /vip/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<ApiResponse<VipProfile>, ServiceError> {
    let profile = services::vip::profile(&state.pool, user.user_id).await?;
    Ok(ApiResponse::success(profile))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub plan_id: i32,
}

/// POST /vip/purchase
pub async fn purchase(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PurchaseRequest>,
) -> Result<ApiResponse<VipProfile>, ServiceError> {
    let profile = services::vip::purchase(&state, user.user_id, req.plan_id).await?;
    Ok(ApiResponse::success(profile))
}

//! 优惠券接口

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use shared::models::UserCouponStatus;
use shared::{ApiResponse, AppError};

use crate::auth::CurrentUser;
use crate::core::{AppState, ServiceError};
use crate::services;
use crate::services::coupon::MyCoupon;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PagedCoupons {
    pub items: Vec<MyCoupon>,
    pub total: i64,
}

fn parse_status(raw: Option<&str>) -> Result<Option<UserCouponStatus>, AppError> {
    match raw {
        None | Some("") => Ok(None),
        Some("available") => Ok(Some(UserCouponStatus::Available)),
        Some("used") => Ok(Some(UserCouponStatus::Used)),
        Some("expired") => Ok(Some(UserCouponStatus::Expired)),
        Some(other) => Err(AppError::invalid_params(format!("unknown status: {other}"))),
    }
}

/// GET /coupons/mine
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<PagedCoupons>, ServiceError> {
    let status = parse_status(query.status.as_deref())?;
    let (items, total) = services::coupon::list_my_coupons(
        &state.pool,
        user.user_id,
        status,
        query.page.unwrap_or(1),
        query.size.unwrap_or(20),
    )
    .await?;
    Ok(ApiResponse::success(PagedCoupons { items, total }))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub coupon_id: i64,
}

/// POST /coupons/purchase
pub async fn purchase(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PurchaseRequest>,
) -> Result<ApiResponse<MyCoupon>, ServiceError> {
    let coupon = services::coupon::purchase(&state.pool, user.user_id, req.coupon_id).await?;
    Ok(ApiResponse::success(coupon))
}

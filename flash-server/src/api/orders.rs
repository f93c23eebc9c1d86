//! 订单接口

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use shared::models::{Order, OrderStatus, Payment};
use shared::{ApiResponse, AppError};

use crate::auth::CurrentUser;
use crate::core::{AppState, ServiceError};
use crate::services;
use crate::services::order::{OrderDetail, PollResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PagedOrders {
    pub items: Vec<Order>,
    pub total: i64,
}

fn parse_status(raw: Option<&str>) -> Result<Option<OrderStatus>, AppError> {
    match raw {
        None | Some("") => Ok(None),
        Some("unpaid") => Ok(Some(OrderStatus::Unpaid)),
        Some("paid") => Ok(Some(OrderStatus::Paid)),
        Some("failed") => Ok(Some(OrderStatus::Failed)),
        Some(other) => Err(AppError::invalid_params(format!("unknown status: {other}"))),
    }
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<PagedOrders>, ServiceError> {
    let status = parse_status(query.status.as_deref())?;
    let (items, total) = services::order::list(
        &state,
        user.user_id,
        status,
        query.page.unwrap_or(1),
        query.size.unwrap_or(20),
    )
    .await?;
    Ok(ApiResponse::success(PagedOrders { items, total }))
}

/// GET /orders/{id}
pub async fn detail(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<OrderDetail>, ServiceError> {
    let detail = services::order::detail(&state, user.user_id, id).await?;
    Ok(ApiResponse::success(detail))
}

/// GET /orders/poll/{order_num}
pub async fn poll(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_num): Path<String>,
) -> Result<ApiResponse<PollResult>, ServiceError> {
    let result = services::order::poll(&state, user.user_id, &order_num).await?;
    Ok(ApiResponse::success(result))
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    /// 为空时仅释放已绑定的券并恢复原价
    pub coupon_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApplyCouponResponse {
    pub order: Order,
    pub payment: Payment,
}

/// POST /orders/{id}/apply-coupon
pub async fn apply_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<ApplyCouponRequest>,
) -> Result<ApiResponse<ApplyCouponResponse>, ServiceError> {
    let (order, payment) =
        services::order::apply_coupon(&state, user.user_id, id, req.coupon_id).await?;
    Ok(ApiResponse::success(ApplyCouponResponse { order, payment }))
}

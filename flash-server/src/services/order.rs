//! 订单服务
//!
//! 查询、轮询与换券。换券在一个事务里完成「释放旧券 → 锁定新券 →
//! 改写支付金额」，券绑定与金额保持一致。

use serde::Serialize;

use shared::error::ErrorCode;
use shared::models::{Order, OrderStatus, Payment, PaymentStatus, UserCoupon};

use super::coupon;
use crate::cache::pending::{self, PendingStatus};
use crate::core::{AppState, ServiceError, ServiceResult};
use crate::db;

/// 订单详情（含支付单与绑定的券）
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub payment: Option<Payment>,
    pub coupon: Option<UserCoupon>,
}

/// 轮询结果
#[derive(Debug, Serialize)]
pub struct PollResult {
    pub status: PendingStatus,
    pub order_num: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 分页查询当前用户订单
pub async fn list(
    state: &AppState,
    user_id: i64,
    status: Option<OrderStatus>,
    page: i64,
    page_size: i64,
) -> ServiceResult<(Vec<Order>, i64)> {
    let page = page.max(1);
    let page_size = if page_size <= 0 || page_size > 100 {
        20
    } else {
        page_size
    };
    Ok(db::order::list_by_user(&state.pool, user_id, status, page, page_size).await?)
}

/// 订单详情，含支付单与绑定的券
pub async fn detail(state: &AppState, user_id: i64, order_id: i64) -> ServiceResult<OrderDetail> {
    let order = db::order::get_by_id(&state.pool, order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| ServiceError::code(ErrorCode::OrderNotFound))?;

    let payment = db::payment::get_by_order_id(&state.pool, order.id).await?;
    let coupon = db::coupon::get_bound_to_order(&state.pool, order.id).await?;

    Ok(OrderDetail {
        order,
        payment,
        coupon,
    })
}

/// 轮询订单物化状态：先查 pending 缓存，miss 后回源数据库
pub async fn poll(state: &AppState, user_id: i64, order_num: &str) -> ServiceResult<PollResult> {
    let mut conn = state.redis.clone();

    if let Some(entry) = pending::get(&mut conn, order_num).await? {
        // 缓存带 user_id 时校验归属
        if entry.user_id.is_some_and(|uid| uid != user_id) {
            return Err(ServiceError::code(ErrorCode::OrderNotFound));
        }
        let order = match entry.status {
            PendingStatus::Ready => db::order::get_by_order_num(&state.pool, order_num).await?,
            _ => None,
        };
        return Ok(PollResult {
            status: entry.status,
            order_num: order_num.to_owned(),
            payment_id: (!entry.payment_id.is_empty()).then(|| entry.payment_id.clone()),
            order,
            message: entry.message,
        });
    }

    // 缓存过期：落库即 ready
    let order = db::order::get_by_order_num(&state.pool, order_num)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| ServiceError::code(ErrorCode::OrderNotFound))?;
    let payment = db::payment::get_by_order_id(&state.pool, order.id).await?;

    Ok(PollResult {
        status: PendingStatus::Ready,
        order_num: order_num.to_owned(),
        payment_id: payment.map(|p| p.payment_id),
        order: Some(order),
        message: None,
    })
}

/// 应用/更换/取消优惠券，重算支付金额
///
/// `user_coupon_id = None` 只释放旧券并恢复原价。
pub async fn apply_coupon(
    state: &AppState,
    user_id: i64,
    order_id: i64,
    user_coupon_id: Option<i64>,
) -> ServiceResult<(Order, Payment)> {
    let mut tx = state.pool.begin().await?;

    let order = db::order::get_by_id(&mut *tx, order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| ServiceError::code(ErrorCode::OrderNotFound))?;
    if order.status != OrderStatus::Unpaid {
        return Err(shared::AppError::invalid_params("订单已结算，不能更换优惠券").into());
    }

    let payment = db::payment::get_by_order_id(&mut *tx, order.id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::PaymentNotFound))?;
    if payment.status != PaymentStatus::Pending {
        return Err(shared::AppError::invalid_params("支付单已结算，不能更换优惠券").into());
    }

    // 原价作为计算基准
    let base_cents = db::product::get_by_id(&mut *tx, order.product_id)
        .await?
        .map(|p| p.price_cents)
        .ok_or_else(|| ServiceError::code(ErrorCode::ProductNotFound))?;

    // 先释放旧券（换券/取消场景）
    db::coupon::release_by_order(&mut *tx, order.id).await?;

    let final_cents = match user_coupon_id {
        Some(ucid) => {
            let applied = coupon::apply(&mut *tx, user_id, ucid, base_cents).await?;
            db::coupon::mark_used(&mut *tx, applied.user_coupon.id, order.id).await?;
            applied.final_cents
        }
        None => base_cents,
    };

    db::payment::set_amount_if_pending(&mut *tx, order.id, final_cents).await?;
    let payment = db::payment::get_by_order_id(&mut *tx, order.id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::PaymentNotFound))?;

    tx.commit().await?;
    Ok((order, payment))
}

//! 支付回调对账
//!
//! 纯状态机：条件更新驱动 `pending → paid/failed/refunded`，重复或
//! 乱序回调命中 0 行即按幂等成功返回当前状态。成功支付在同一事务内
//! 行锁累计用户消费并重算成长等级；失败/退款释放绑定的优惠券。

use shared::error::ErrorCode;
use shared::models::{Order, OrderStatus, Payment, PaymentStatus};

use super::vip;
use crate::core::{AppState, ServiceError, ServiceResult};
use crate::db;

/// 回调目标状态解析；pending 不是合法目标
pub fn parse_target(status: &str) -> Option<PaymentStatus> {
    match status {
        "paid" => Some(PaymentStatus::Paid),
        "failed" => Some(PaymentStatus::Failed),
        "refunded" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

/// 处理支付回调，返回终态的订单与支付单
pub async fn handle_callback(
    state: &AppState,
    payment_id: &str,
    target_status: &str,
    notify_data: &str,
) -> ServiceResult<(Order, Payment)> {
    let target = parse_target(target_status)
        .ok_or_else(|| ServiceError::code(ErrorCode::UnsupportedStatus))?;

    let mut tx = state.pool.begin().await?;

    let payment = db::payment::get_by_payment_id(&mut *tx, payment_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::PaymentNotFound))?;

    // 条件更新：只有 pending 可迁移；0 行代表重复或乱序回调
    let rows =
        db::payment::set_status_if_pending(&mut *tx, payment_id, target, notify_data).await?;
    if rows == 0 {
        let order = db::order::get_by_id(&mut *tx, payment.order_id)
            .await?
            .ok_or_else(|| ServiceError::code(ErrorCode::OrderNotFound))?;
        tx.commit().await?;
        tracing::info!(payment_id, "Duplicate payment callback, returning current state");
        return Ok((order, payment));
    }

    let order_status = if target == PaymentStatus::Paid {
        OrderStatus::Paid
    } else {
        OrderStatus::Failed
    };
    db::order::set_status_if(&mut *tx, payment.order_id, OrderStatus::Unpaid, order_status)
        .await?;

    let order = db::order::get_by_id(&mut *tx, payment.order_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::OrderNotFound))?;

    match target {
        PaymentStatus::Paid => {
            // 行锁串行化同一用户的并发回调，再累计消费与成长等级
            if let Some(user) = db::user::get_by_id_for_update(&mut *tx, order.user_id).await? {
                let new_total = user.total_spent_cents + payment.amount_cents;
                let level = vip::growth_level(new_total);
                db::user::add_spend(&mut *tx, user.id, payment.amount_cents, level).await?;
            }
        }
        PaymentStatus::Failed | PaymentStatus::Refunded => {
            let released = db::coupon::release_by_order(&mut *tx, order.id).await?;
            if released > 0 {
                tracing::info!(order_id = order.id, released, "Coupons released on failed payment");
            }
        }
        PaymentStatus::Pending => unreachable!("pending is not a callback target"),
    }

    let payment = db::payment::get_by_payment_id(&mut *tx, payment_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::PaymentNotFound))?;

    tx.commit().await?;

    // 支付成功后刷新商品缓存（提交后进行，worker 合并去重）
    if target == PaymentStatus::Paid {
        if let Ok(Some(stock)) = db::product::get_stock(&state.pool, order.product_id).await {
            state.cache_workers.refresh_stock(order.product_id, stock as i64);
        }
        state.cache_workers.invalidate_product_info(order.product_id);
    }

    Ok((order, payment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("paid"), Some(PaymentStatus::Paid));
        assert_eq!(parse_target("failed"), Some(PaymentStatus::Failed));
        assert_eq!(parse_target("refunded"), Some(PaymentStatus::Refunded));
        assert_eq!(parse_target("pending"), None);
        assert_eq!(parse_target("settled"), None);
    }
}

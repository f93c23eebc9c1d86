//! 优惠券服务
//!
//! apply 与 mark_used 必须跑在订单变更所在的事务里，券绑定与订单
//! 状态保持原子；月度发券按「当月窗口计数 + 配额」幂等。

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use shared::error::ErrorCode;
use shared::models::{Coupon, CouponKind, UserCoupon, UserCouponStatus};

use crate::core::{ServiceError, ServiceResult};
use crate::db;
use crate::db::coupon::{NewUserCoupon, TemplateSpec};

/// 各等级月度配额
const VIP_MONTHLY_QUOTA: [(i32, i64); 4] = [(1, 1), (2, 2), (3, 3), (4, 4)];

/// 优惠计算：满减直接减，折扣按百分比，负数截断到 0
pub fn compute_discount(
    kind: CouponKind,
    amount_cents: i64,
    discount_rate: i32,
    base_cents: i64,
) -> Result<i64, ErrorCode> {
    let discounted = match kind {
        CouponKind::FullCut => base_cents - amount_cents,
        CouponKind::Discount => {
            if discount_rate <= 0 || discount_rate >= 100 {
                return Err(ErrorCode::CouponInvalidRate);
            }
            base_cents * discount_rate as i64 / 100
        }
    };
    Ok(discounted.max(0))
}

/// apply 的产出：锁定的用户券、模板与优惠后金额
#[derive(Debug)]
pub struct AppliedCoupon {
    pub user_coupon: UserCoupon,
    pub template: Coupon,
    pub final_cents: i64,
}

/// 校验并计算优惠后金额（行锁用户券）
///
/// 调用方负责在同一事务里 mark_used 并改写支付单金额。
pub async fn apply(
    tx: &mut PgConnection,
    user_id: i64,
    user_coupon_id: i64,
    base_cents: i64,
) -> ServiceResult<AppliedCoupon> {
    let now = Utc::now();

    let uc = db::coupon::get_user_coupon_for_update(&mut *tx, user_coupon_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::CouponNotFound))?;

    // 归属、状态、有效期
    if uc.user_id != user_id {
        return Err(ServiceError::code(ErrorCode::CouponNotFound));
    }
    if uc.status != UserCouponStatus::Available {
        return Err(ServiceError::code(ErrorCode::CouponNotAvailable));
    }
    if now < uc.valid_from || now > uc.valid_to {
        return Err(ServiceError::code(ErrorCode::CouponExpired));
    }

    let template = db::coupon::get_template(&mut *tx, uc.coupon_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::CouponNotFound))?;

    if base_cents < template.min_spend_cents {
        return Err(ServiceError::code(ErrorCode::CouponBelowThreshold));
    }

    let final_cents = compute_discount(
        template.kind,
        template.amount_cents,
        template.discount_rate,
        base_cents,
    )
    .map_err(ServiceError::code)?;

    Ok(AppliedCoupon {
        user_coupon: uc,
        template,
        final_cents,
    })
}

/// 用户券视图（模板字段拍平，状态实时修正）
#[derive(Debug, Clone, Serialize)]
pub struct MyCoupon {
    pub id: i64,
    pub coupon_id: i64,
    pub kind: CouponKind,
    pub title: String,
    pub description: String,
    pub amount_cents: i64,
    pub discount_rate: i32,
    pub min_spend_cents: i64,
    pub status: UserCouponStatus,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub obtained_from: String,
}

/// 查询用户优惠券列表，支持分页与状态过滤
pub async fn list_my_coupons(
    pool: &PgPool,
    user_id: i64,
    status: Option<UserCouponStatus>,
    page: i64,
    page_size: i64,
) -> ServiceResult<(Vec<MyCoupon>, i64)> {
    let page = page.max(1);
    let page_size = if page_size <= 0 || page_size > 100 {
        20
    } else {
        page_size
    };
    let now = Utc::now();

    let (ucs, total) = db::coupon::list_by_user(pool, user_id, status, page, page_size).await?;
    if ucs.is_empty() {
        return Ok((Vec::new(), total));
    }

    let ids: Vec<i64> = ucs.iter().map(|uc| uc.coupon_id).collect();
    let templates = db::coupon::list_templates_by_ids(pool, &ids).await?;
    let by_id: std::collections::HashMap<i64, Coupon> =
        templates.into_iter().map(|c| (c.id, c)).collect();

    let mut out = Vec::with_capacity(ucs.len());
    for uc in ucs {
        let Some(template) = by_id.get(&uc.coupon_id) else {
            continue;
        };
        // 实时修正：available 但已过期的返回 expired
        let effective_status =
            if uc.status == UserCouponStatus::Available && now > uc.valid_to {
                UserCouponStatus::Expired
            } else {
                uc.status
            };
        out.push(MyCoupon {
            id: uc.id,
            coupon_id: uc.coupon_id,
            kind: template.kind,
            title: template.title.clone(),
            description: template.description.clone(),
            amount_cents: template.amount_cents,
            discount_rate: template.discount_rate,
            min_spend_cents: template.min_spend_cents,
            status: effective_status,
            valid_from: uc.valid_from,
            valid_to: uc.valid_to,
            obtained_from: uc.obtained_from,
        });
    }
    Ok((out, total))
}

/// 购买优惠券，事务保护
pub async fn purchase(pool: &PgPool, user_id: i64, coupon_id: i64) -> ServiceResult<MyCoupon> {
    let mut tx = pool.begin().await?;

    let template = db::coupon::get_template(&mut *tx, coupon_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::CouponNotFound))?;
    if !template.purchasable {
        return Err(ServiceError::code(ErrorCode::CouponNotPurchasable));
    }

    let uc = db::coupon::create_user_coupon(
        &mut *tx,
        &NewUserCoupon {
            user_id,
            coupon_id,
            obtained_from: "purchase".into(),
            valid_from: template.valid_from,
            valid_to: template.valid_to,
        },
    )
    .await?;

    tx.commit().await?;

    Ok(MyCoupon {
        id: uc.id,
        coupon_id: uc.coupon_id,
        kind: template.kind,
        title: template.title,
        description: template.description,
        amount_cents: template.amount_cents,
        discount_rate: template.discount_rate,
        min_spend_cents: template.min_spend_cents,
        status: uc.status,
        valid_from: uc.valid_from,
        valid_to: uc.valid_to,
        obtained_from: uc.obtained_from,
    })
}

/// 当月窗口：[本月 1 号 00:00, 下月 1 号 00:00)
pub fn month_period(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .expect("first of month is always valid");
    let end = if now.month() == 12 {
        Utc.with_ymd_and_hms(now.year() + 1, 1, 1, 0, 0, 0)
    } else {
        Utc.with_ymd_and_hms(now.year(), now.month() + 1, 1, 0, 0, 0)
    }
    .single()
    .expect("first of month is always valid");
    (start, end)
}

fn monthly_quota(level: i32) -> i64 {
    let level = level.clamp(1, 4);
    VIP_MONTHLY_QUOTA
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, q)| *q)
        .unwrap_or(0)
}

/// 各等级月度券模板
fn vip_template(level: i32, now: DateTime<Utc>) -> TemplateSpec {
    let valid_from = now - Duration::days(365);
    let valid_to = now + Duration::days(365);
    match level {
        1 => TemplateSpec {
            kind: CouponKind::FullCut,
            title: "VIP L1 月度券".into(),
            amount_cents: 500,
            discount_rate: 0,
            min_spend_cents: 3000,
            valid_from,
            valid_to,
        },
        2 => TemplateSpec {
            kind: CouponKind::FullCut,
            title: "VIP L2 月度券".into(),
            amount_cents: 1000,
            discount_rate: 0,
            min_spend_cents: 5000,
            valid_from,
            valid_to,
        },
        3 => TemplateSpec {
            kind: CouponKind::Discount,
            title: "VIP L3 月度券".into(),
            amount_cents: 0,
            discount_rate: 90,
            min_spend_cents: 0,
            valid_from,
            valid_to,
        },
        _ => TemplateSpec {
            kind: CouponKind::Discount,
            title: "VIP L4 月度券".into(),
            amount_cents: 0,
            discount_rate: 85,
            min_spend_cents: 0,
            valid_from,
            valid_to,
        },
    }
}

/// 按月配额为指定等级的用户发券（幂等：当月超配额不再发）
pub async fn issue_vip_monthly(pool: &PgPool, user_id: i64, level: i32) -> ServiceResult<()> {
    let level = level.clamp(1, 4);
    let quota = monthly_quota(level);
    if quota <= 0 {
        return Ok(());
    }

    let now = Utc::now();
    let (start, end) = month_period(now);
    let existing = db::coupon::count_by_period(pool, user_id, "vip_month", start, end).await?;
    if existing >= quota {
        return Ok(());
    }

    let template = db::coupon::get_or_create_template(pool, &vip_template(level, now)).await?;

    let need = (quota - existing) as usize;
    let rows: Vec<NewUserCoupon> = (0..need)
        .map(|_| NewUserCoupon {
            user_id,
            coupon_id: template.id,
            obtained_from: "vip_month".into(),
            valid_from: start,
            valid_to: end,
        })
        .collect();
    db::coupon::batch_create_user_coupons(pool, &rows).await?;

    Ok(())
}

/// 批量将已过期但仍 available 的券标记为 expired
pub async fn mark_expired(pool: &PgPool) -> ServiceResult<u64> {
    Ok(db::coupon::mark_expired_batch(pool, Utc::now()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cut_discount() {
        assert_eq!(
            compute_discount(CouponKind::FullCut, 500, 0, 3000),
            Ok(2500)
        );
        // 满减超过订单金额时截断到 0
        assert_eq!(compute_discount(CouponKind::FullCut, 5000, 0, 3000), Ok(0));
    }

    #[test]
    fn test_rate_discount() {
        assert_eq!(compute_discount(CouponKind::Discount, 0, 90, 10000), Ok(9000));
        assert_eq!(compute_discount(CouponKind::Discount, 0, 85, 999), Ok(849));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        assert_eq!(
            compute_discount(CouponKind::Discount, 0, 0, 1000),
            Err(ErrorCode::CouponInvalidRate)
        );
        assert_eq!(
            compute_discount(CouponKind::Discount, 0, 100, 1000),
            Err(ErrorCode::CouponInvalidRate)
        );
        assert_eq!(
            compute_discount(CouponKind::Discount, 0, -5, 1000),
            Err(ErrorCode::CouponInvalidRate)
        );
    }

    #[test]
    fn test_month_period() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 30, 0).unwrap();
        let (start, end) = month_period(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_period_december_wraps() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_period(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_quota_clamped() {
        assert_eq!(monthly_quota(0), 1);
        assert_eq!(monthly_quota(1), 1);
        assert_eq!(monthly_quota(4), 4);
        assert_eq!(monthly_quota(9), 4);
    }
}

//! VIP 服务
//!
//! 成长等级由累计实付金额按固定阈值推导；付费 VIP 是独立的套餐行，
//! 生效等级取两者较大值。

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use shared::error::ErrorCode;

use super::coupon;
use crate::core::{AppState, ServiceError, ServiceResult};
use crate::db;

/// 成长等级阈值（单位：分），越往后间隔越大
/// L1: 0-999 元, L2: 1,000-4,999 元, L3: 5,000-19,999 元, L4: 20,000 元+
const GROWTH_THRESHOLDS: [(i32, i64); 4] = [
    (1, 0),
    (2, 100_000),
    (3, 500_000),
    (4, 2_000_000),
];

/// 按累计实付金额（分）计算成长等级
pub fn growth_level(total_spent_cents: i64) -> i32 {
    let mut level = 1;
    for (l, min) in GROWTH_THRESHOLDS {
        if total_spent_cents >= min && l > level {
            level = l;
        }
    }
    level
}

/// 付费 VIP 套餐配置
#[derive(Debug, Clone, Copy)]
pub struct PaidPlan {
    pub plan_id: i32,
    pub level: i32,
    pub duration_days: i64,
    pub price_cents: i64,
}

/// 预置套餐：L3 30 天 / L4 90 天
pub fn paid_plan(plan_id: i32) -> Option<PaidPlan> {
    match plan_id {
        1 => Some(PaidPlan {
            plan_id: 1,
            level: 3,
            duration_days: 30,
            price_cents: 3000,
        }),
        2 => Some(PaidPlan {
            plan_id: 2,
            level: 4,
            duration_days: 90,
            price_cents: 8000,
        }),
        _ => None,
    }
}

/// 用户 VIP 状态视图
#[derive(Debug, Clone, Serialize)]
pub struct VipProfile {
    /// 累计消费（分）
    pub total_spent_cents: i64,
    /// 成长等级（消费累计）
    pub growth_level: i32,
    /// 付费等级（过期为 0）
    pub paid_level: i32,
    /// 付费到期时间
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_expired_at: Option<chrono::DateTime<Utc>>,
    /// 生效等级 = max(成长, 付费)
    pub effective_level: i32,
}

/// 查询用户 VIP 状态，合并成长等级与付费等级
pub async fn profile(pool: &PgPool, user_id: i64) -> ServiceResult<VipProfile> {
    let user = db::user::get_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ServiceError::code(ErrorCode::UserNotFound))?;

    let paid = db::paid_vip::get_by_user(pool, user_id).await?;

    let now = Utc::now();
    let (paid_level, paid_expired_at) = match paid {
        Some(pv) if pv.expired_at > now => (pv.level, Some(pv.expired_at)),
        _ => (0, None),
    };

    Ok(VipProfile {
        total_spent_cents: user.total_spent_cents,
        growth_level: user.growth_level,
        paid_level,
        paid_expired_at,
        effective_level: user.growth_level.max(paid_level),
    })
}

/// 开通付费 VIP（模拟购买成功），立即发放当月 VIP 优惠券
pub async fn purchase(state: &AppState, user_id: i64, plan_id: i32) -> ServiceResult<VipProfile> {
    let plan = paid_plan(plan_id)
        .ok_or_else(|| ServiceError::App(shared::AppError::invalid_params("未知付费VIP套餐")))?;

    let started_at = Utc::now();
    let expired_at = started_at + Duration::days(plan.duration_days);
    db::paid_vip::upsert(&state.pool, user_id, plan.level, started_at, expired_at).await?;

    if let Err(e) = coupon::issue_vip_monthly(&state.pool, user_id, plan.level).await {
        tracing::warn!(user_id, level = plan.level, error = %e, "VIP coupon issuance failed");
    }

    profile(&state.pool, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_level_thresholds() {
        assert_eq!(growth_level(0), 1);
        assert_eq!(growth_level(99_999), 1);
        assert_eq!(growth_level(100_000), 2);
        assert_eq!(growth_level(499_999), 2);
        assert_eq!(growth_level(500_000), 3);
        assert_eq!(growth_level(1_999_999), 3);
        assert_eq!(growth_level(2_000_000), 4);
        assert_eq!(growth_level(i64::MAX), 4);
    }

    #[test]
    fn test_growth_level_is_monotonic() {
        let samples = [0, 1, 99_999, 100_000, 400_000, 500_000, 2_000_000, 9_999_999];
        let mut prev = 0;
        for s in samples {
            let level = growth_level(s);
            assert!(level >= prev);
            prev = level;
        }
    }

    #[test]
    fn test_paid_plans() {
        let p1 = paid_plan(1).unwrap();
        assert_eq!((p1.level, p1.duration_days, p1.price_cents), (3, 30, 3000));
        let p2 = paid_plan(2).unwrap();
        assert_eq!((p2.level, p2.duration_days, p2.price_cents), (4, 90, 8000));
        assert!(paid_plan(3).is_none());
    }
}

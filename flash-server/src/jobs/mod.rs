//! 定时任务
//!
//! 不引入 cron 框架：月度任务自己算下一次触发点（每月 1 号 00:01）
//! 然后 sleep，其余任务用固定间隔。Outbox 补偿在
//! [`crate::outbox::OutboxDispatcher`] 自己的循环里。

use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db;
use crate::services::coupon;

/// 券过期清扫间隔
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// 下一次月度发券时刻：下月 1 号 00:01
fn next_monthly_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 1, 0)
        .single()
        .expect("first of month is always valid")
}

/// 月度 VIP 发券循环
///
/// 每月 1 号 00:01 为成长等级 >= 1 的用户与有效期内的付费 VIP 发放
/// 月度优惠券；发放本身按月窗口幂等，重复触发不超配额。
pub async fn run_vip_monthly(pool: PgPool, shutdown: CancellationToken) {
    tracing::info!("VIP monthly coupon job started");
    loop {
        let now = Utc::now();
        let next = next_monthly_run(now);
        let wait = (next - now)
            .to_std()
            .unwrap_or_else(|_| Duration::from_secs(60));
        tracing::debug!(next = %next, "VIP monthly job sleeping");

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("VIP monthly coupon job stopping");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        issue_monthly_coupons(&pool).await;
    }
}

/// 为所有 VIP 用户发放月度优惠券
async fn issue_monthly_coupons(pool: &PgPool) {
    let started = Utc::now();
    tracing::info!("VIP monthly coupon issuance started");

    let mut success = 0usize;
    let mut fail = 0usize;

    // 1. 成长等级用户
    match db::user::list_with_growth_level(pool, 1).await {
        Ok(users) => {
            for user in users {
                match coupon::issue_vip_monthly(pool, user.id, user.growth_level).await {
                    Ok(()) => success += 1,
                    Err(e) => {
                        tracing::warn!(user_id = user.id, error = %e, "Growth user issuance failed");
                        fail += 1;
                    }
                }
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to list growth users"),
    }

    // 2. 付费 VIP 用户（等级可能更高，覆盖发放）
    match db::paid_vip::list_active(pool, Utc::now()).await {
        Ok(vips) => {
            for vip in vips {
                match coupon::issue_vip_monthly(pool, vip.user_id, vip.level).await {
                    Ok(()) => success += 1,
                    Err(e) => {
                        tracing::warn!(user_id = vip.user_id, error = %e, "Paid VIP issuance failed");
                        fail += 1;
                    }
                }
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to list paid VIPs"),
    }

    tracing::info!(
        success,
        fail,
        elapsed_ms = (Utc::now() - started).num_milliseconds(),
        "VIP monthly coupon issuance finished"
    );
}

/// 券过期清扫循环：过期但仍 available 的券批量置 expired
pub async fn run_coupon_expiry(pool: PgPool, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Coupon expiry job stopping");
                return;
            }
            _ = ticker.tick() => {
                match coupon::mark_expired(&pool).await {
                    Ok(0) => {}
                    Ok(expired) => tracing::info!(expired, "Coupons marked expired"),
                    Err(e) => tracing::error!(error = %e, "Coupon expiry sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_monthly_run() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        assert_eq!(
            next_monthly_run(now),
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 1, 0).unwrap()
        );
    }

    #[test]
    fn test_next_monthly_run_december() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(
            next_monthly_run(now),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap()
        );
    }

    #[test]
    fn test_next_monthly_run_is_future() {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 0, 1, 0).unwrap();
        assert!(next_monthly_run(now) > now);
    }
}

//! Redis 键布局（单一命名空间）
//!
//! - `product:stock:{id}`: 库存计数器，预占脚本原子扣减
//! - `product:users:{id}`: 抢购成功用户集合（去重）
//! - `product:info:{id}`: 商品详情 JSON，或 `"null"` 防穿透哨兵
//! - `order:pending:{order_num}`: 订单处理状态，供前端轮询
//! - `rl:{purpose}:{key}`: 令牌桶哈希
//! - `risk:{ip|user}:{black|gray}`: 风控名单集合

pub fn stock_key(product_id: i64) -> String {
    format!("product:stock:{product_id}")
}

pub fn users_key(product_id: i64) -> String {
    format!("product:users:{product_id}")
}

pub fn info_key(product_id: i64) -> String {
    format!("product:info:{product_id}")
}

pub fn pending_key(order_num: &str) -> String {
    format!("order:pending:{order_num}")
}

pub fn rate_limit_key(purpose: &str, key: &str) -> String {
    format!("rl:{purpose}:{key}")
}

pub const RISK_IP_BLACK: &str = "risk:ip:black";
pub const RISK_IP_GRAY: &str = "risk:ip:gray";
pub const RISK_USER_BLACK: &str = "risk:user:black";
pub const RISK_USER_GRAY: &str = "risk:user:gray";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(stock_key(7), "product:stock:7");
        assert_eq!(users_key(7), "product:users:7");
        assert_eq!(info_key(7), "product:info:7");
        assert_eq!(pending_key("123"), "order:pending:123");
        assert_eq!(rate_limit_key("seckill", "/api/v1/seckill"), "rl:seckill:/api/v1/seckill");
    }
}

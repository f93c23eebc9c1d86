//! 秒杀引擎：高并发限量抢购服务
//!
//! 热路径：准入限流 → Redis 原子预占 → Outbox 落盘 → Kafka 异步落库。
//! 结算路径：支付回调状态机 → 成长等级累计 → 优惠券释放。
//!
//! 两个二进制共用本库：
//! - `flash-server`: HTTP API + Outbox 派发 + 定时任务
//! - `flash-worker`: Kafka 批量消费 + 订单物化

pub mod api;
pub mod auth;
pub mod broker;
pub mod cache;
pub mod core;
pub mod db;
pub mod jobs;
pub mod limiter;
pub mod outbox;
pub mod risk;
pub mod services;
pub mod utils;

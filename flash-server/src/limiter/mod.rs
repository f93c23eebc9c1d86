//! 双层准入限流：本地令牌桶 → Redis 分布式令牌桶
//!
//! 本地层配置为全局额度的 2 倍，先挡掉大部分超限请求减少 Redis 压力；
//! 精确的全局额度由 Redis 脚本执行。

pub mod distributed;
pub mod local;
pub mod middleware;

pub use local::{LimiterRegistry, LocalLimiter};

//! Redis 分布式令牌桶
//!
//! Lua 保证原子性；懒补充（按 now - last_time 折算新令牌），无后台任务。
//! Redis 异常时放行（fail open）：基础设施故障不应放大为全站拒绝。

use redis::aio::ConnectionManager;
use redis::Script;
use std::sync::OnceLock;

const TOKEN_BUCKET_LUA: &str = r#"
local rate = tonumber(ARGV[1])
local burst = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local requested = tonumber(ARGV[4])
local ttl = tonumber(ARGV[5])

local key = KEYS[1]
local last_tokens = tonumber(redis.call("HGET", key, "tokens")) or burst
local last_time = tonumber(redis.call("HGET", key, "time")) or now

local delta = math.max(0, now - last_time)
local filled = math.min(burst, last_tokens + delta * rate)
local allowed = filled >= requested
local new_tokens = filled
if allowed then
  new_tokens = filled - requested
end

redis.call("HSET", key, "tokens", new_tokens)
redis.call("HSET", key, "time", now)
redis.call("EXPIRE", key, ttl)

-- Redis 不支持直接返回 boolean，false 会变成 nil，故转为数字 1/0
if allowed then
  return 1
else
  return 0
end
"#;

fn token_bucket_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(TOKEN_BUCKET_LUA))
}

/// 令牌桶哈希默认 TTL（秒）
pub const BUCKET_TTL_SECS: i64 = 120;

/// 执行分布式令牌桶，返回是否放行
pub async fn allow(
    conn: &mut ConnectionManager,
    key: &str,
    rate: u32,
    burst: u32,
    ttl_secs: i64,
) -> bool {
    let now = chrono::Utc::now().timestamp();
    let result: Result<i64, _> = token_bucket_script()
        .key(key)
        .arg(rate)
        .arg(burst)
        .arg(now)
        .arg(1)
        .arg(ttl_secs.max(1))
        .invoke_async(conn)
        .await;

    match result {
        Ok(allowed) => allowed == 1,
        Err(e) => {
            // 限流脚本执行失败，默认放行避免误杀
            tracing::warn!(key, error = %e, "Rate limit script failed, failing open");
            true
        }
    }
}

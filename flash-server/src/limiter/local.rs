//! 本地内存限流器
//!
//! 分片 map 减少锁竞争：key 哈希进 64 个分片，每片一把互斥锁。
//! 桶懒创建、懒补充（无后台补币任务），空闲超过 10 分钟的条目由
//! 单个 janitor 定期清理。

use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const SHARD_COUNT: usize = 64;
const SHARD_MASK: u64 = (SHARD_COUNT as u64) - 1;
/// 空闲条目过期时间
const ENTRY_TTL: Duration = Duration::from_secs(600);
/// janitor 清理间隔
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// 单个前缀的本地限流器
pub struct LocalLimiter {
    shards: Vec<Mutex<HashMap<String, Bucket>>>,
    rate: f64,
    burst: f64,
}

impl LocalLimiter {
    /// rate: 每秒令牌数, burst: 桶容量
    pub fn new(rate: u32, burst: u32) -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        for _ in 0..SHARD_COUNT {
            shards.push(Mutex::new(HashMap::new()));
        }
        Self {
            shards,
            rate: rate as f64,
            burst: burst as f64,
        }
    }

    /// 检查是否允许通过，非阻塞
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let shard = &self.shards[shard_index(key)];
        let mut map = shard.lock().expect("limiter shard poisoned");

        let bucket = map.entry(key.to_owned()).or_insert_with(|| Bucket {
            tokens: self.burst,
            last_refill: now,
            last_seen: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.rate).min(self.burst);
        bucket.last_refill = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// 清理空闲超过 TTL 的条目
    fn cleanup(&self, now: Instant) {
        for shard in &self.shards {
            let mut map = shard.lock().expect("limiter shard poisoned");
            map.retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) < ENTRY_TTL);
        }
    }
}

fn shard_index(key: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() & SHARD_MASK) as usize
}

/// 限流器注册表：prefix → limiter
///
/// 所有限流器共用一个 janitor（由二进制入口 spawn）。
#[derive(Clone, Default)]
pub struct LimiterRegistry {
    limiters: Arc<DashMap<String, Arc<LocalLimiter>>>,
}

impl LimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取或创建指定前缀的本地限流器
    pub fn get_or_create(&self, prefix: &str, rate: u32, burst: u32) -> Arc<LocalLimiter> {
        if let Some(limiter) = self.limiters.get(prefix) {
            return limiter.clone();
        }
        self.limiters
            .entry(prefix.to_owned())
            .or_insert_with(|| Arc::new(LocalLimiter::new(rate, burst)))
            .clone()
    }

    /// 清理所有限流器的空闲条目
    pub fn cleanup(&self) {
        let now = Instant::now();
        for limiter in self.limiters.iter() {
            limiter.cleanup(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject() {
        let limiter = LocalLimiter::new(5, 5);
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.allow_at("k", now));
        }
        assert!(!limiter.allow_at("k", now));
    }

    #[test]
    fn test_refill_over_time() {
        let limiter = LocalLimiter::new(10, 10);
        let start = Instant::now();
        for _ in 0..10 {
            assert!(limiter.allow_at("k", start));
        }
        assert!(!limiter.allow_at("k", start));

        // 100ms 后补充 1 个令牌
        let later = start + Duration::from_millis(100);
        assert!(limiter.allow_at("k", later));
        assert!(!limiter.allow_at("k", later));
    }

    #[test]
    fn test_refill_caps_at_burst() {
        let limiter = LocalLimiter::new(100, 3);
        let start = Instant::now();
        // 长时间空闲后也只有 burst 个令牌
        let later = start + Duration::from_secs(60);
        assert!(limiter.allow_at("k", start));
        for _ in 0..3 {
            assert!(limiter.allow_at("k", later));
        }
        assert!(!limiter.allow_at("k", later));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = LocalLimiter::new(1, 1);
        let now = Instant::now();
        assert!(limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
        assert!(!limiter.allow_at("a", now));
    }

    #[test]
    fn test_cleanup_drops_idle_entries() {
        let limiter = LocalLimiter::new(1, 1);
        let start = Instant::now();
        assert!(limiter.allow_at("k", start));

        limiter.cleanup(start + Duration::from_secs(601));
        // 条目被清理后重新创建，桶重新满额
        assert!(limiter.allow_at("k", start + Duration::from_secs(601)));
    }

    #[test]
    fn test_registry_returns_same_instance() {
        let registry = LimiterRegistry::new();
        let a = registry.get_or_create("login", 5, 5);
        let b = registry.get_or_create("login", 99, 99);
        assert!(Arc::ptr_eq(&a, &b));
    }
}

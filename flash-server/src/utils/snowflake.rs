//! 雪花 ID 生成器
//!
//! 41 位毫秒时间戳 + 10 位机器号 + 12 位序列号。订单号与支付号都由它
//! 生成，跨进程唯一性依赖部署时为每个实例配置不同的 machine_id。

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch: 2024-01-01T00:00:00Z, milliseconds
const EPOCH_MS: u64 = 1_704_067_200_000;

const MACHINE_BITS: u8 = 10;
const SEQUENCE_BITS: u8 = 12;

const MAX_MACHINE_ID: u16 = (1 << MACHINE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

#[derive(Debug)]
struct State {
    last_ms: u64,
    sequence: u64,
}

/// Snowflake ID generator, shared via `Arc` in [`crate::core::AppState`]
#[derive(Debug)]
pub struct IdGenerator {
    machine_id: u16,
    state: Mutex<State>,
}

impl IdGenerator {
    /// Create a generator for the given machine id (0..1024)
    pub fn new(machine_id: u16) -> Self {
        Self {
            machine_id: machine_id & MAX_MACHINE_ID,
            state: Mutex::new(State {
                last_ms: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate the next id as i64
    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock().expect("snowflake state poisoned");
        let mut now = current_millis();

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // 序列号用尽，自旋到下一毫秒
                while now <= state.last_ms {
                    now = current_millis();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = now;

        let ts = now.saturating_sub(EPOCH_MS);
        ((ts << (MACHINE_BITS + SEQUENCE_BITS))
            | ((self.machine_id as u64) << SEQUENCE_BITS)
            | state.sequence) as i64
    }

    /// Generate the next id as a decimal string (order_num / payment_id)
    pub fn next_string(&self) -> String {
        self.next_id().to_string()
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let generator = IdGenerator::new(1);
        let mut prev = 0i64;
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = generator.next_id();
            assert!(id > prev);
            assert!(seen.insert(id));
            prev = id;
        }
    }

    #[test]
    fn test_machine_id_is_embedded() {
        let generator = IdGenerator::new(42);
        let id = generator.next_id() as u64;
        let machine = (id >> SEQUENCE_BITS) & (MAX_MACHINE_ID as u64);
        assert_eq!(machine, 42);
    }

    #[test]
    fn test_machine_id_wraps_to_range() {
        let generator = IdGenerator::new(u16::MAX);
        let id = generator.next_id() as u64;
        let machine = (id >> SEQUENCE_BITS) & (MAX_MACHINE_ID as u64);
        assert_eq!(machine, (u16::MAX & MAX_MACHINE_ID) as u64);
    }

    #[test]
    fn test_concurrent_uniqueness() {
        use std::sync::Arc;
        let generator = Arc::new(IdGenerator::new(3));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let generator = generator.clone();
            handles.push(std::thread::spawn(move || {
                (0..2_000).map(|_| generator.next_id()).collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
    }
}

//! 共享缓存：Redis 键布局、原子脚本、pending 状态与一致性 worker

pub mod keys;
pub mod pending;
pub mod product_info;
pub mod scripts;
pub mod workers;

pub use product_info::ProductCache;
pub use workers::CacheWorkers;

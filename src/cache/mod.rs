//! 缓存层
//!
//! 按 (论文ID, 阶段, 来源) 持久化获取结果和生成产物，跨进程保持稳定。

pub mod store;

pub use store::{CacheEntry, CacheStore};

//! # 门诊存储模块
//!
//! 持久化协作方的边界：协调层在每次写操作后导出快照，
//! 由本模块负责落盘；进程启动时读取快照恢复初始状态。
//! 快照内容对存储层是不透明的序列化负载。

pub mod snapshot;

pub use snapshot::{LocalSnapshotStore, MemorySnapshotStore, SnapshotStore};

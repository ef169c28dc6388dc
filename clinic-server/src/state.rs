//! 服务共享状态

use clinic_flow::SharedFlowEngine;
use clinic_storage::SnapshotStore;
use std::sync::Arc;

/// HTTP 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: SharedFlowEngine,
    pub store: Arc<dyn SnapshotStore>,
}

impl AppState {
    pub fn new(engine: SharedFlowEngine, store: Arc<dyn SnapshotStore>) -> Self {
        Self { engine, store }
    }

    /// 写操作成功后镜像最新快照到存储协作方
    ///
    /// 存储失败不回滚内存状态，仅记录错误待下次写入重试。
    pub async fn persist(&self) {
        let snapshot = self.engine.read().await.snapshot();
        if let Err(e) = self.store.save(&snapshot).await {
            tracing::error!("快照写入失败: {}", e);
        }
    }
}

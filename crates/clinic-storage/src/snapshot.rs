//! 快照存储

use async_trait::async_trait;
use clinic_core::{ClinicError, FlowSnapshot, Result};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// 快照存储接口
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 写入最新快照（整体覆盖）
    async fn save(&self, snapshot: &FlowSnapshot) -> Result<()>;

    /// 读取快照；尚无快照时返回 `Ok(None)`
    async fn load(&self) -> Result<Option<FlowSnapshot>>;
}

/// 本地文件快照存储
///
/// 以 JSON 形式整体写入单个文件，父目录按需创建。
pub struct LocalSnapshotStore {
    path: PathBuf,
}

impl LocalSnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 快照文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for LocalSnapshotStore {
    async fn save(&self, snapshot: &FlowSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.path, data).await?;

        tracing::debug!("Snapshot saved to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<FlowSnapshot>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => {
                let snapshot = serde_json::from_slice(&data)?;
                tracing::info!("Snapshot loaded from {}", self.path.display());
                Ok(Some(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClinicError::Storage(format!(
                "Failed to read snapshot {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// 内存快照存储（测试与演示用）
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<Option<FlowSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, snapshot: &FlowSnapshot) -> Result<()> {
        *self.inner.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<FlowSnapshot>> {
        Ok(self.inner.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clinic_core::{Token, TokenStatus};
    use uuid::Uuid;

    fn sample_snapshot() -> FlowSnapshot {
        let now = Utc::now();
        FlowSnapshot {
            waiting: vec![Token {
                id: Uuid::new_v4(),
                token_number: 1,
                patient_name: "王芳".to_string(),
                assigned_doctor: "陈医生".to_string(),
                scheduled_time: now,
                estimated_wait_minutes: 15,
                status: TokenStatus::Waiting,
                created_at: now,
                updated_at: now,
            }],
            active: vec![],
            escalated: vec![],
            completed: vec![],
            audit: vec![],
            override_active: true,
        }
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&sample_snapshot()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.waiting.len(), 1);
        assert!(loaded.override_active);
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSnapshotStore::new(dir.path().join("state/flow.json"));

        // 尚无快照时返回 None
        assert!(store.load().await.unwrap().is_none());

        store.save(&sample_snapshot()).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.waiting[0].patient_name, "王芳");

        // 覆盖写入取最新内容
        let mut updated = sample_snapshot();
        updated.override_active = false;
        store.save(&updated).await.unwrap();
        assert!(!store.load().await.unwrap().unwrap().override_active);
    }

    #[tokio::test]
    async fn test_local_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = LocalSnapshotStore::new(&path);
        assert!(store.load().await.is_err());
    }
}

//! 审计台账
//!
//! 只追加的就诊完成记录，供历史报表使用。
//! 记录一经写入不可修改或删除，与在场队列的后续变化无关。

use clinic_core::AuditRecord;

/// 审计台账
#[derive(Debug, Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
}

impl AuditLog {
    /// 创建空台账
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条完成记录
    pub fn append(&mut self, record: AuditRecord) {
        tracing::info!(
            "Audit record appended: token {} patient {} doctor {}",
            record.token_number,
            record.patient_name,
            record.doctor_name
        );
        self.records.push(record);
    }

    /// 按最近优先返回全部记录快照
    pub fn recent(&self) -> Vec<AuditRecord> {
        let mut records = self.records.clone();
        records.reverse();
        records
    }

    /// 台账记录总数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 台账是否为空
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按写入顺序导出全部记录（用于快照）
    pub fn export(&self) -> Vec<AuditRecord> {
        self.records.clone()
    }

    /// 从快照恢复台账
    pub fn restore(&mut self, records: Vec<AuditRecord>) {
        tracing::info!("Audit log restored with {} records", records.len());
        self.records = records;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(token_number: u32) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            token_number,
            patient_name: "王芳".to_string(),
            doctor_name: "陈医生".to_string(),
            completed_at: Utc::now(),
            duration_seconds: 600,
            notes: None,
        }
    }

    #[test]
    fn test_append_and_count() {
        let mut log = AuditLog::new();
        assert!(log.is_empty());

        log.append(record(1));
        log.append(record(2));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_recent_is_most_recent_first() {
        let mut log = AuditLog::new();
        log.append(record(1));
        log.append(record(2));
        log.append(record(3));

        let recent = log.recent();
        let numbers: Vec<u32> = recent.iter().map(|r| r.token_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[test]
    fn test_export_restore_round_trip() {
        let mut log = AuditLog::new();
        log.append(record(1));
        log.append(record(2));

        let mut restored = AuditLog::new();
        restored.restore(log.export());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.recent()[0].token_number, 2);
    }
}

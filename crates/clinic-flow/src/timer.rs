//! 问诊计时器
//!
//! 维护按医生配置的预期问诊时长表，并从会话计时推导
//! 进度百分比、超时与显著超时信号。推导只用于展示与提醒，
//! 不会触发任何登记处层面的状态转换。

use clinic_core::ConsultationSession;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 未配置医生时使用的预期问诊时长（秒）
pub const DEFAULT_EXPECTED_SECONDS: u64 = 900;

/// 超过预期多少秒后视为显著超时（触发转急诊提示）
pub const EXTENDED_GRACE_SECONDS: u64 = 300;

/// 按医生配置的预期问诊时长表
#[derive(Debug, Clone)]
pub struct ExpectedDurations {
    table: HashMap<String, u64>,
    default_seconds: u64,
}

impl ExpectedDurations {
    /// 创建使用默认回退值的时长表
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            default_seconds: DEFAULT_EXPECTED_SECONDS,
        }
    }

    /// 配置某位医生的预期问诊时长
    pub fn set(&mut self, doctor_name: &str, seconds: u64) {
        self.table.insert(doctor_name.to_string(), seconds);
    }

    /// 查询医生的预期问诊时长，未配置时返回默认值
    pub fn expected_for(&self, doctor_name: &str) -> u64 {
        self.table
            .get(doctor_name)
            .copied()
            .unwrap_or(self.default_seconds)
    }
}

impl Default for ExpectedDurations {
    fn default() -> Self {
        Self::new()
    }
}

/// 单个会话的推导进度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    pub session_id: Uuid,
    pub token_id: Uuid,
    pub token_number: u32,
    pub doctor_name: String,
    pub patient_name: String,
    pub elapsed_seconds: u64,
    pub expected_seconds: u64,
    pub progress_percent: u32,
    pub is_overdue: bool,
    pub is_extended: bool,
}

/// 问诊计时器
#[derive(Debug, Default)]
pub struct ConsultationTimer {
    durations: ExpectedDurations,
}

impl ConsultationTimer {
    /// 创建新的计时器
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置医生预期时长
    pub fn set_expected(&mut self, doctor_name: &str, seconds: u64) {
        self.durations.set(doctor_name, seconds);
    }

    /// 查询医生预期时长
    pub fn expected_for(&self, doctor_name: &str) -> u64 {
        self.durations.expected_for(doctor_name)
    }

    /// 从会话推导展示进度，不改变任何存储状态
    pub fn observe(&self, session: &ConsultationSession) -> SessionProgress {
        let expected = self.durations.expected_for(&session.doctor_name);
        let elapsed = session.elapsed_seconds;

        let progress_percent =
            ((elapsed as f64 / expected as f64) * 100.0).round().min(100.0) as u32;

        SessionProgress {
            session_id: session.id,
            token_id: session.token_id,
            token_number: session.token_number,
            doctor_name: session.doctor_name.clone(),
            patient_name: session.patient_name.clone(),
            elapsed_seconds: elapsed,
            expected_seconds: expected,
            progress_percent,
            is_overdue: elapsed > expected,
            is_extended: elapsed > expected + EXTENDED_GRACE_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(doctor: &str, elapsed: u64) -> ConsultationSession {
        ConsultationSession {
            id: Uuid::new_v4(),
            token_id: Uuid::new_v4(),
            token_number: 1,
            doctor_name: doctor.to_string(),
            patient_name: "王芳".to_string(),
            started_at: Utc::now(),
            elapsed_seconds: elapsed,
        }
    }

    #[test]
    fn test_default_fallback() {
        let timer = ConsultationTimer::new();
        assert_eq!(timer.expected_for("未配置的医生"), DEFAULT_EXPECTED_SECONDS);
    }

    #[test]
    fn test_progress_percent_caps_at_100() {
        let mut timer = ConsultationTimer::new();
        timer.set_expected("陈医生", 600);

        let progress = timer.observe(&session("陈医生", 300));
        assert_eq!(progress.progress_percent, 50);

        let progress = timer.observe(&session("陈医生", 1800));
        assert_eq!(progress.progress_percent, 100);
    }

    #[test]
    fn test_overdue_and_extended_thresholds() {
        let mut timer = ConsultationTimer::new();
        timer.set_expected("陈医生", 900);

        // 905 秒：已超时但未显著超时（905 < 900 + 300）
        let progress = timer.observe(&session("陈医生", 905));
        assert!(progress.is_overdue);
        assert!(!progress.is_extended);

        // 恰好到达预期不算超时
        let progress = timer.observe(&session("陈医生", 900));
        assert!(!progress.is_overdue);

        // 1205 秒：显著超时
        let progress = timer.observe(&session("陈医生", 1205));
        assert!(progress.is_overdue);
        assert!(progress.is_extended);

        // 恰好到达宽限上限不算显著超时
        let progress = timer.observe(&session("陈医生", 1200));
        assert!(!progress.is_extended);
    }

    #[test]
    fn test_observe_does_not_mutate() {
        let timer = ConsultationTimer::new();
        let s = session("陈医生", 42);

        timer.observe(&s);
        timer.observe(&s);
        assert_eq!(s.elapsed_seconds, 42);
    }
}

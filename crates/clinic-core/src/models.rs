//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 排队令牌状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TokenStatus {
    Waiting,        // 候诊
    InConsultation, // 就诊中
    Escalated,      // 已转急诊
    Completed,      // 已完成
}

impl TokenStatus {
    /// 是否为终态（令牌不再回到队列）
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenStatus::Escalated | TokenStatus::Completed)
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStatus::Waiting => write!(f, "Waiting"),
            TokenStatus::InConsultation => write!(f, "InConsultation"),
            TokenStatus::Escalated => write!(f, "Escalated"),
            TokenStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// 排队令牌
///
/// `id` 是权威标识；`token_number` 仅用于展示和排序，允许出现空号。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: Uuid,
    pub token_number: u32,
    pub patient_name: String,
    pub assigned_doctor: String,
    pub scheduled_time: DateTime<Utc>,
    pub estimated_wait_minutes: i64,
    pub status: TokenStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Token {
    /// 人类可读的号牌标签，如 "T-042"
    pub fn label(&self) -> String {
        crate::utils::format_token_label(self.token_number)
    }
}

/// 接诊申请（由表现层提交）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitRequest {
    pub patient_name: String,
    pub assigned_doctor: String,
    pub scheduled_time: DateTime<Utc>,
    pub estimated_wait_minutes: i64,
}

/// 进行中的问诊会话
///
/// 仅在令牌从候诊转入就诊时创建；结束或转急诊时销毁。
/// `elapsed_seconds` 在会话存活期间单调递增，终止后冻结。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationSession {
    pub id: Uuid,
    pub token_id: Uuid,
    pub token_number: u32,
    pub doctor_name: String,
    pub patient_name: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
}

/// 就诊完成审计记录
///
/// 仅在成功完成时写入，写入后不可变更。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub token_number: u32,
    pub patient_name: String,
    pub doctor_name: String,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub notes: Option<String>,
}

/// 全量状态快照（持久化协作方的交换格式）
///
/// 每次写操作后由协调层导出，进程启动时用于恢复初始状态。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub waiting: Vec<Token>,
    pub active: Vec<ConsultationSession>,
    pub escalated: Vec<Token>,
    pub completed: Vec<Token>,
    pub audit: Vec<AuditRecord>,
    pub override_active: bool,
}

/// 血型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BloodGroup {
    APos,  // A+
    ANeg,  // A-
    BPos,  // B+
    BNeg,  // B-
    AbPos, // AB+
    AbNeg, // AB-
    OPos,  // O+
    ONeg,  // O-
}

impl std::fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BloodGroup::APos => "A+",
            BloodGroup::ANeg => "A-",
            BloodGroup::BPos => "B+",
            BloodGroup::BNeg => "B-",
            BloodGroup::AbPos => "AB+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::OPos => "O+",
            BloodGroup::ONeg => "O-",
        };
        write!(f, "{}", s)
    }
}

/// 血液请求通道
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum BloodRequestChannel {
    /// 医院间定向请求，仅目标机构可应答
    Direct { facility: String },
    /// 社区广播，任意机构可应答
    Broadcast,
}

/// 血液请求状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BloodRequestStatus {
    Pending,      // 待应答
    Acknowledged, // 已应答
    Declined,     // 已婉拒
    Fulfilled,    // 已完成调配
}

/// 血液调配请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: Uuid,
    pub blood_group: BloodGroup,
    pub units: u32,
    pub requested_by: String,
    pub channel: BloodRequestChannel,
    pub status: BloodRequestStatus,
    pub created_at: DateTime<Utc>,
    pub responded_by: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
}

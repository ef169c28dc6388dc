//! 流转事件
//!
//! 通过进程内广播通道向表现层推送状态变化与计时滴答信号。
//! 订阅方落后导致丢失事件时应重新拉取只读投影。

use clinic_core::{AuditRecord, ConsultationSession, Token};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 流转事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowEvent {
    TokenAdmitted(Token),
    TokenApproved(ConsultationSession),
    TokenRescheduled(Token),
    SessionFinalized(AuditRecord),
    SessionEscalated { token_id: Uuid, token_number: u32 },
    OverrideChanged { active: bool },
    Tick { active_sessions: usize },
}

impl FlowEvent {
    /// 事件的点分主题名，供表现层按主题过滤
    pub fn as_str(&self) -> &str {
        match self {
            Self::TokenAdmitted(_) => "token.admitted",
            Self::TokenApproved(_) => "token.approved",
            Self::TokenRescheduled(_) => "token.rescheduled",
            Self::SessionFinalized(_) => "session.finalized",
            Self::SessionEscalated { .. } => "session.escalated",
            Self::OverrideChanged { .. } => "override.changed",
            Self::Tick { .. } => "timer.tick",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        let event = FlowEvent::OverrideChanged { active: true };
        assert_eq!(event.as_str(), "override.changed");

        let event = FlowEvent::Tick { active_sessions: 3 };
        assert_eq!(event.as_str(), "timer.tick");
    }
}

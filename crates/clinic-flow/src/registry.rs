//! 令牌登记处
//!
//! 管理候诊、就诊、转急诊、已完成四个分区的令牌流转

use chrono::Utc;
use clinic_core::utils::next_token_number;
use clinic_core::{
    AdmitRequest, ClinicError, ConsultationSession, FlowSnapshot, Result, Token, TokenStatus,
};
use uuid::Uuid;

/// 令牌登记处
///
/// 任一令牌在任意时刻只存在于一个分区；所有流转操作都是
/// 单次同步变更，调用方不会观察到令牌不在任何分区的中间态。
#[derive(Debug, Default)]
pub struct TokenRegistry {
    waiting: Vec<Token>,
    active: Vec<ConsultationSession>,
    escalated: Vec<Token>,
    completed: Vec<Token>,
}

impl TokenRegistry {
    /// 创建新的登记处
    pub fn new() -> Self {
        Self::default()
    }

    /// 受理新令牌，加入候诊队列
    ///
    /// 号牌取现存在场号牌（候诊+就诊）最大值加一，
    /// 队列清空后从 1 重新起号，允许出现空号。
    pub fn admit(&mut self, request: AdmitRequest) -> Result<Token> {
        if request.patient_name.trim().is_empty() {
            return Err(ClinicError::Validation("patient name is empty".to_string()));
        }
        if request.assigned_doctor.trim().is_empty() {
            return Err(ClinicError::Validation("doctor name is empty".to_string()));
        }

        let live_numbers = self
            .waiting
            .iter()
            .map(|t| t.token_number)
            .chain(self.active.iter().map(|s| s.token_number));
        let token_number = next_token_number(live_numbers);

        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4(),
            token_number,
            patient_name: request.patient_name,
            assigned_doctor: request.assigned_doctor,
            scheduled_time: request.scheduled_time,
            estimated_wait_minutes: request.estimated_wait_minutes,
            status: TokenStatus::Waiting,
            created_at: now,
            updated_at: now,
        };

        self.waiting.push(token.clone());

        tracing::info!(
            "Admitted token {} ({}) for patient {}",
            token.id,
            token.label(),
            token.patient_name
        );
        Ok(token)
    }

    /// 叫号就诊：令牌移出候诊队列并创建问诊会话
    pub fn approve(&mut self, token_id: Uuid) -> Result<ConsultationSession> {
        let pos = self
            .waiting
            .iter()
            .position(|t| t.id == token_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Waiting token {} not found", token_id)))?;

        let mut token = self.waiting.remove(pos);
        token.status = TokenStatus::InConsultation;
        token.updated_at = Utc::now();

        let session = ConsultationSession {
            id: Uuid::new_v4(),
            token_id: token.id,
            token_number: token.token_number,
            doctor_name: token.assigned_doctor.clone(),
            patient_name: token.patient_name.clone(),
            started_at: token.updated_at,
            elapsed_seconds: 0,
        };
        self.active.push(session.clone());

        tracing::info!(
            "Approved token {} ({}), session {} started with doctor {}",
            token.id,
            token.label(),
            session.id,
            session.doctor_name
        );
        Ok(session)
    }

    /// 改约：仅记录，不改变排队顺序
    pub fn reschedule(&mut self, token_id: Uuid) -> Result<Token> {
        let token = self
            .waiting
            .iter_mut()
            .find(|t| t.id == token_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Waiting token {} not found", token_id)))?;

        token.updated_at = Utc::now();

        tracing::info!(
            "Rescheduled token {} ({}) for patient {}",
            token.id,
            token.label(),
            token.patient_name
        );
        Ok(token.clone())
    }

    /// 就诊完成：销毁会话，令牌进入已完成分区
    pub fn finalize(&mut self, token_id: Uuid) -> Result<(ConsultationSession, Token)> {
        let (session, token) = self.remove_active(token_id, TokenStatus::Completed)?;

        tracing::info!(
            "Finalized session {} for token {} after {}s",
            session.id,
            token_id,
            session.elapsed_seconds
        );
        Ok((session, token))
    }

    /// 转急诊：销毁会话，令牌进入转急诊分区，不写审计台账
    pub fn escalate(&mut self, token_id: Uuid) -> Result<(ConsultationSession, Token)> {
        let (session, token) = self.remove_active(token_id, TokenStatus::Escalated)?;

        tracing::warn!(
            "Escalated session {} for token {} after {}s",
            session.id,
            token_id,
            session.elapsed_seconds
        );
        Ok((session, token))
    }

    /// 从就诊分区移除会话并把令牌放入指定终态分区
    fn remove_active(
        &mut self,
        token_id: Uuid,
        terminal: TokenStatus,
    ) -> Result<(ConsultationSession, Token)> {
        let pos = self
            .active
            .iter()
            .position(|s| s.token_id == token_id)
            .ok_or_else(|| {
                ClinicError::NotFound(format!("Active session for token {} not found", token_id))
            })?;

        let session = self.active.remove(pos);
        let now = Utc::now();
        let token = Token {
            id: session.token_id,
            token_number: session.token_number,
            patient_name: session.patient_name.clone(),
            assigned_doctor: session.doctor_name.clone(),
            scheduled_time: session.started_at,
            estimated_wait_minutes: 0,
            status: terminal,
            created_at: session.started_at,
            updated_at: now,
        };

        match terminal {
            TokenStatus::Completed => self.completed.push(token.clone()),
            TokenStatus::Escalated => self.escalated.push(token.clone()),
            other => {
                return Err(ClinicError::InvalidState(format!(
                    "{} is not a terminal partition",
                    other
                )))
            }
        }

        Ok((session, token))
    }

    /// 推进所有存活会话的计时一秒，返回被推进的会话数
    ///
    /// 会话在 finalize/escalate 时即被移出就诊分区，
    /// 因此同一把锁下到达的滴答不会推进已终止的计时。
    pub fn tick_sessions(&mut self) -> usize {
        for session in &mut self.active {
            session.elapsed_seconds += 1;
        }
        self.active.len()
    }

    /// 按受理顺序返回候诊令牌快照
    pub fn waiting_tokens(&self) -> Vec<Token> {
        self.waiting.clone()
    }

    /// 返回在诊会话快照
    pub fn active_sessions(&self) -> Vec<ConsultationSession> {
        self.active.clone()
    }

    /// 返回转急诊令牌快照
    pub fn escalated_tokens(&self) -> Vec<Token> {
        self.escalated.clone()
    }

    /// 返回已完成令牌快照
    pub fn completed_tokens(&self) -> Vec<Token> {
        self.completed.clone()
    }

    /// 查找候诊令牌
    pub fn find_waiting(&self, token_id: Uuid) -> Option<Token> {
        self.waiting.iter().find(|t| t.id == token_id).cloned()
    }

    /// 按令牌查找在诊会话
    pub fn find_session(&self, token_id: Uuid) -> Option<ConsultationSession> {
        self.active.iter().find(|s| s.token_id == token_id).cloned()
    }

    /// 候诊人数
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// 在诊人数
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// 从快照恢复四个分区
    pub fn restore(&mut self, snapshot: &FlowSnapshot) {
        self.waiting = snapshot.waiting.clone();
        self.active = snapshot.active.clone();
        self.escalated = snapshot.escalated.clone();
        self.completed = snapshot.completed.clone();

        tracing::info!(
            "Registry restored: {} waiting, {} active, {} escalated, {} completed",
            self.waiting.len(),
            self.active.len(),
            self.escalated.len(),
            self.completed.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(patient: &str, doctor: &str) -> AdmitRequest {
        AdmitRequest {
            patient_name: patient.to_string(),
            assigned_doctor: doctor.to_string(),
            scheduled_time: Utc::now(),
            estimated_wait_minutes: 15,
        }
    }

    fn contains(tokens: &[Token], id: Uuid) -> bool {
        tokens.iter().any(|t| t.id == id)
    }

    #[test]
    fn test_admit_assigns_sequential_numbers() {
        let mut registry = TokenRegistry::new();

        let t1 = registry.admit(request("王芳", "陈医生")).unwrap();
        let t2 = registry.admit(request("李强", "陈医生")).unwrap();
        assert_eq!(t1.token_number, 1);
        assert_eq!(t2.token_number, 2);
        assert_eq!(t2.label(), "T-002");
        // 候诊队列按受理顺序提供
        let waiting = registry.waiting_tokens();
        assert_eq!(waiting[0].id, t1.id);
        assert_eq!(waiting[1].id, t2.id);
    }

    #[test]
    fn test_number_restarts_after_queue_drains() {
        let mut registry = TokenRegistry::new();

        let t1 = registry.admit(request("王芳", "陈医生")).unwrap();
        registry.approve(t1.id).unwrap();
        registry.finalize(t1.id).unwrap();

        // 在场号牌已清空，重新从 1 起号
        let t2 = registry.admit(request("李强", "陈医生")).unwrap();
        assert_eq!(t2.token_number, 1);
    }

    #[test]
    fn test_number_gap_tolerated() {
        let mut registry = TokenRegistry::new();

        let t1 = registry.admit(request("王芳", "陈医生")).unwrap();
        let t2 = registry.admit(request("李强", "周医生")).unwrap();
        assert_eq!((t1.token_number, t2.token_number), (1, 2));

        // 1 号完成后仍有 2 号在场，下一个号牌是 3
        registry.approve(t1.id).unwrap();
        registry.finalize(t1.id).unwrap();
        let t3 = registry.admit(request("赵敏", "陈医生")).unwrap();
        assert_eq!(t3.token_number, 3);
    }

    #[test]
    fn test_partition_exclusivity() {
        let mut registry = TokenRegistry::new();
        let token = registry.admit(request("王芳", "陈医生")).unwrap();
        let id = token.id;

        // 候诊
        assert!(contains(&registry.waiting_tokens(), id));
        assert!(registry.active_sessions().is_empty());

        // 就诊
        registry.approve(id).unwrap();
        assert!(!contains(&registry.waiting_tokens(), id));
        assert!(registry.find_session(id).is_some());
        assert!(!contains(&registry.completed_tokens(), id));

        // 完成
        registry.finalize(id).unwrap();
        assert!(registry.find_session(id).is_none());
        assert!(contains(&registry.completed_tokens(), id));
        assert!(!contains(&registry.escalated_tokens(), id));
    }

    #[test]
    fn test_escalate_moves_to_escalated_partition() {
        let mut registry = TokenRegistry::new();
        let token = registry.admit(request("王芳", "陈医生")).unwrap();
        registry.approve(token.id).unwrap();

        let (session, escalated) = registry.escalate(token.id).unwrap();
        assert_eq!(session.token_id, token.id);
        assert_eq!(escalated.status, TokenStatus::Escalated);
        assert!(contains(&registry.escalated_tokens(), token.id));
        assert!(registry.completed_tokens().is_empty());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut registry = TokenRegistry::new();
        let ghost = Uuid::new_v4();

        assert!(matches!(
            registry.approve(ghost),
            Err(ClinicError::NotFound(_))
        ));
        assert!(matches!(
            registry.reschedule(ghost),
            Err(ClinicError::NotFound(_))
        ));
        assert!(matches!(
            registry.finalize(ghost),
            Err(ClinicError::NotFound(_))
        ));
        assert!(matches!(
            registry.escalate(ghost),
            Err(ClinicError::NotFound(_))
        ));
    }

    #[test]
    fn test_reschedule_keeps_order() {
        let mut registry = TokenRegistry::new();
        let t1 = registry.admit(request("王芳", "陈医生")).unwrap();
        let t2 = registry.admit(request("李强", "陈医生")).unwrap();

        registry.reschedule(t1.id).unwrap();

        let waiting = registry.waiting_tokens();
        assert_eq!(waiting[0].id, t1.id);
        assert_eq!(waiting[1].id, t2.id);
        assert_eq!(waiting[0].status, TokenStatus::Waiting);
    }

    #[test]
    fn test_tick_only_touches_live_sessions() {
        let mut registry = TokenRegistry::new();
        let t1 = registry.admit(request("王芳", "陈医生")).unwrap();
        let t2 = registry.admit(request("李强", "周医生")).unwrap();
        registry.approve(t1.id).unwrap();
        registry.approve(t2.id).unwrap();

        assert_eq!(registry.tick_sessions(), 2);
        assert_eq!(registry.tick_sessions(), 2);

        let (session, _) = registry.finalize(t1.id).unwrap();
        assert_eq!(session.elapsed_seconds, 2);

        // 终止后的滴答不再影响已冻结的计时
        assert_eq!(registry.tick_sessions(), 1);
        assert_eq!(registry.find_session(t2.id).unwrap().elapsed_seconds, 3);
        let completed = registry.completed_tokens();
        assert_eq!(completed.len(), 1);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut registry = TokenRegistry::new();
        let t1 = registry.admit(request("王芳", "陈医生")).unwrap();
        let _t2 = registry.admit(request("李强", "周医生")).unwrap();
        registry.approve(t1.id).unwrap();

        let snapshot = FlowSnapshot {
            waiting: registry.waiting_tokens(),
            active: registry.active_sessions(),
            escalated: registry.escalated_tokens(),
            completed: registry.completed_tokens(),
            audit: vec![],
            override_active: false,
        };

        let mut restored = TokenRegistry::new();
        restored.restore(&snapshot);
        assert_eq!(restored.waiting_count(), 1);
        assert_eq!(restored.active_count(), 1);
        assert!(restored.find_session(t1.id).is_some());
    }
}

//! 流转引擎
//!
//! 协调状态机、登记处、应急预案、计时器与审计台账的核心引擎，
//! 是表现层唯一允许的变更入口。写操作要么完整生效，
//! 要么返回具体的守卫错误，失败后引擎仍可继续使用。

use crate::{
    audit::AuditLog,
    blood::BloodRequestBoard,
    events::FlowEvent,
    protocol::EmergencyProtocol,
    registry::TokenRegistry,
    state_machine::{TokenEvent, TokenStateMachine},
    timer::{ConsultationTimer, SessionProgress},
};
use chrono::Utc;
use clinic_core::{
    AdmitRequest, AuditRecord, BloodGroup, BloodRequest, ClinicError, ConsultationSession,
    FlowSnapshot, Result, Token,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// 事件通道容量；订阅方落后会丢失事件，应重新拉取投影
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 流转引擎
#[derive(Debug)]
pub struct FlowEngine {
    state_machine: TokenStateMachine,
    registry: TokenRegistry,
    protocol: EmergencyProtocol,
    timer: ConsultationTimer,
    audit: AuditLog,
    blood: BloodRequestBoard,
    events: broadcast::Sender<FlowEvent>,
}

/// 多线程环境下的共享引擎
///
/// 所有变更（包括滴答）都经由同一把写锁，
/// 保证"令牌恰好存在于一个分区"在并发调用下仍然成立。
pub type SharedFlowEngine = Arc<RwLock<FlowEngine>>;

impl FlowEngine {
    /// 创建新的流转引擎
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state_machine: TokenStateMachine::new(),
            registry: TokenRegistry::new(),
            protocol: EmergencyProtocol::new(),
            timer: ConsultationTimer::new(),
            audit: AuditLog::new(),
            blood: BloodRequestBoard::new(),
            events,
        }
    }

    /// 包装为共享引擎
    pub fn into_shared(self) -> SharedFlowEngine {
        Arc::new(RwLock::new(self))
    }

    /// 订阅流转事件
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: FlowEvent) {
        // 无订阅方时发送失败是正常情况
        let _ = self.events.send(event);
    }

    /// 受理新令牌
    pub fn admit_token(&mut self, request: AdmitRequest) -> Result<Token> {
        if self.protocol.is_active() {
            return Err(ClinicError::OverrideSuspended(
                "admission is suspended".to_string(),
            ));
        }

        let token = self.registry.admit(request)?;
        self.emit(FlowEvent::TokenAdmitted(token.clone()));
        Ok(token)
    }

    /// 叫号就诊，创建问诊会话
    pub fn approve_token(&mut self, token_id: Uuid) -> Result<ConsultationSession> {
        if self.protocol.is_active() {
            return Err(ClinicError::OverrideSuspended(
                "approval is suspended".to_string(),
            ));
        }

        let token = self.registry.find_waiting(token_id).ok_or_else(|| {
            ClinicError::NotFound(format!("Waiting token {} not found", token_id))
        })?;
        self.state_machine
            .transition(token.status, &TokenEvent::Approved)?;

        let session = self.registry.approve(token_id)?;
        self.emit(FlowEvent::TokenApproved(session.clone()));
        Ok(session)
    }

    /// 改约（不影响排队顺序，不受应急预案限制）
    pub fn reschedule_token(&mut self, token_id: Uuid) -> Result<Token> {
        let token = self.registry.find_waiting(token_id).ok_or_else(|| {
            ClinicError::NotFound(format!("Waiting token {} not found", token_id))
        })?;
        self.state_machine
            .transition(token.status, &TokenEvent::Rescheduled)?;

        let token = self.registry.reschedule(token_id)?;
        self.emit(FlowEvent::TokenRescheduled(token.clone()));
        Ok(token)
    }

    /// 就诊完成：销毁会话并写入审计台账
    ///
    /// `elapsed_seconds_at_finalize` 为调用方观察到的会话时长，
    /// 记入台账；引擎自身累计值仍以会话为准。
    /// 应急预案期间在诊患者仍可正常完成。
    pub fn finalize_session(
        &mut self,
        token_id: Uuid,
        elapsed_seconds_at_finalize: u64,
        notes: Option<String>,
    ) -> Result<AuditRecord> {
        self.state_machine
            .transition(clinic_core::TokenStatus::InConsultation, &TokenEvent::Finalized)?;

        let (session, token) = self.registry.finalize(token_id)?;

        let record = AuditRecord {
            id: Uuid::new_v4(),
            token_number: token.token_number,
            patient_name: session.patient_name.clone(),
            doctor_name: session.doctor_name.clone(),
            completed_at: Utc::now(),
            duration_seconds: elapsed_seconds_at_finalize,
            notes,
        };
        self.audit.append(record.clone());
        self.emit(FlowEvent::SessionFinalized(record.clone()));
        Ok(record)
    }

    /// 转急诊：销毁会话，不写审计台账
    pub fn escalate_session(&mut self, token_id: Uuid) -> Result<Token> {
        self.state_machine
            .transition(clinic_core::TokenStatus::InConsultation, &TokenEvent::Escalated)?;

        let (_session, token) = self.registry.escalate(token_id)?;

        self.emit(FlowEvent::SessionEscalated {
            token_id: token.id,
            token_number: token.token_number,
        });
        Ok(token)
    }

    /// 启动应急预案（幂等）
    pub fn activate_override(&mut self, operator: &str) -> bool {
        let changed = self.protocol.activate(operator);
        if changed {
            self.emit(FlowEvent::OverrideChanged { active: true });
        }
        changed
    }

    /// 解除应急预案（幂等）
    pub fn deactivate_override(&mut self) -> bool {
        let changed = self.protocol.deactivate();
        if changed {
            self.emit(FlowEvent::OverrideChanged { active: false });
        }
        changed
    }

    /// 应急预案是否生效
    pub fn override_active(&self) -> bool {
        self.protocol.is_active()
    }

    /// 推进所有存活会话计时一秒并返回最新进度
    pub fn tick(&mut self) -> Vec<SessionProgress> {
        let ticked = self.registry.tick_sessions();
        let progress = self.session_progress();

        self.emit(FlowEvent::Tick {
            active_sessions: ticked,
        });
        progress
    }

    /// 配置医生预期问诊时长
    pub fn set_expected_duration(&mut self, doctor_name: &str, seconds: u64) {
        self.timer.set_expected(doctor_name, seconds);
    }

    /// 查询医生预期问诊时长
    pub fn expected_duration(&self, doctor_name: &str) -> u64 {
        self.timer.expected_for(doctor_name)
    }

    /// 候诊令牌投影（受理顺序）
    pub fn pending_tokens(&self) -> Vec<Token> {
        self.registry.waiting_tokens()
    }

    /// 在诊会话投影
    pub fn active_sessions(&self) -> Vec<ConsultationSession> {
        self.registry.active_sessions()
    }

    /// 在诊会话进度投影（不推进计时）
    pub fn session_progress(&self) -> Vec<SessionProgress> {
        self.registry
            .active_sessions()
            .iter()
            .map(|s| self.timer.observe(s))
            .collect()
    }

    /// 转急诊令牌投影
    pub fn escalated_tokens(&self) -> Vec<Token> {
        self.registry.escalated_tokens()
    }

    /// 完成历史投影（最近优先）
    pub fn completed_history(&self) -> Vec<AuditRecord> {
        self.audit.recent()
    }

    /// 系统概览
    pub fn overview(&self) -> FlowOverview {
        let progress = self.session_progress();
        let overdue_sessions = progress.iter().filter(|p| p.is_overdue).count();
        let extended_sessions = progress.iter().filter(|p| p.is_extended).count();

        let mut doctors_in_consultation: HashMap<String, usize> = HashMap::new();
        for session in self.registry.active_sessions() {
            *doctors_in_consultation
                .entry(session.doctor_name)
                .or_insert(0) += 1;
        }

        FlowOverview {
            waiting_count: self.registry.waiting_count(),
            active_count: self.registry.active_count(),
            escalated_count: self.registry.escalated_tokens().len(),
            completed_count: self.audit.len(),
            overdue_sessions,
            extended_sessions,
            override_active: self.protocol.is_active(),
            doctors_in_consultation,
        }
    }

    /// 导出全量状态快照（供持久化协作方写入）
    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            waiting: self.registry.waiting_tokens(),
            active: self.registry.active_sessions(),
            escalated: self.registry.escalated_tokens(),
            completed: self.registry.completed_tokens(),
            audit: self.audit.export(),
            override_active: self.protocol.is_active(),
        }
    }

    /// 从快照恢复状态（进程启动时调用）
    pub fn restore(&mut self, snapshot: &FlowSnapshot) {
        self.registry.restore(snapshot);
        self.audit.restore(snapshot.audit.clone());
        self.protocol.restore(snapshot.override_active);
    }

    /// 发起医院间定向血液请求
    pub fn post_blood_direct(
        &mut self,
        blood_group: BloodGroup,
        units: u32,
        requested_by: &str,
        facility: &str,
    ) -> Result<BloodRequest> {
        self.blood
            .post_direct(blood_group, units, requested_by, facility)
    }

    /// 发起社区广播血液请求
    pub fn post_blood_broadcast(
        &mut self,
        blood_group: BloodGroup,
        units: u32,
        requested_by: &str,
    ) -> Result<BloodRequest> {
        self.blood.post_broadcast(blood_group, units, requested_by)
    }

    /// 应答血液请求
    pub fn acknowledge_blood(&mut self, request_id: Uuid, facility: &str) -> Result<BloodRequest> {
        self.blood.acknowledge(request_id, facility)
    }

    /// 婉拒定向血液请求（回落广播通道）
    pub fn decline_blood(&mut self, request_id: Uuid, facility: &str) -> Result<BloodRequest> {
        self.blood.decline(request_id, facility)
    }

    /// 完成血液调配
    pub fn fulfill_blood(&mut self, request_id: Uuid, facility: &str) -> Result<BloodRequest> {
        self.blood.fulfill(request_id, facility)
    }

    /// 待应答血液请求投影
    pub fn blood_pending(&self) -> Vec<BloodRequest> {
        self.blood.pending()
    }

    /// 某机构可见的血液请求投影
    pub fn blood_outstanding_for(&self, facility: &str) -> Vec<BloodRequest> {
        self.blood.outstanding_for(facility)
    }

    /// 血液请求历史投影（最近优先）
    pub fn blood_history(&self) -> Vec<BloodRequest> {
        self.blood.history()
    }
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 系统概览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowOverview {
    pub waiting_count: usize,
    pub active_count: usize,
    pub escalated_count: usize,
    pub completed_count: usize,
    pub overdue_sessions: usize,
    pub extended_sessions: usize,
    pub override_active: bool,
    pub doctors_in_consultation: HashMap<String, usize>,
}

/// 启动按秒滴答的后台任务
///
/// 滴答与 finalize/escalate 竞争同一把写锁，
/// 因此不会推进一个刚被销毁的会话。
pub fn spawn_ticker(engine: SharedFlowEngine) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // interval 首次 tick 立即完成，先消费掉
        interval.tick().await;
        loop {
            interval.tick().await;
            engine.write().await.tick();
        }
    })
}

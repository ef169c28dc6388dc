//! 令牌状态机
//!
//! 管理排队令牌的完整生命周期状态转换

use clinic_core::{ClinicError, Result, TokenStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 令牌状态转换事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TokenEvent {
    Approved,    // 叫号就诊
    Rescheduled, // 改约（仅记录，不改变排队顺序）
    Finalized,   // 就诊完成
    Escalated,   // 转急诊
}

/// 令牌状态机
#[derive(Debug)]
pub struct TokenStateMachine {
    transitions: HashMap<(TokenStatus, TokenEvent), TokenStatus>,
}

impl TokenStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert(
            (TokenStatus::Waiting, TokenEvent::Approved),
            TokenStatus::InConsultation,
        );
        transitions.insert(
            (TokenStatus::Waiting, TokenEvent::Rescheduled),
            TokenStatus::Waiting,
        );
        transitions.insert(
            (TokenStatus::InConsultation, TokenEvent::Finalized),
            TokenStatus::Completed,
        );
        transitions.insert(
            (TokenStatus::InConsultation, TokenEvent::Escalated),
            TokenStatus::Escalated,
        );

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: TokenStatus, event: &TokenEvent) -> bool {
        self.transitions.contains_key(&(from, event.clone()))
    }

    /// 执行状态转换
    pub fn transition(&self, from: TokenStatus, event: &TokenEvent) -> Result<TokenStatus> {
        match self.transitions.get(&(from, event.clone())) {
            Some(to) => Ok(*to),
            None => Err(ClinicError::InvalidStateTransition {
                from: from.to_string(),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取状态的所有可能事件
    pub fn possible_events(&self, current_state: TokenStatus) -> Vec<TokenEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current_state)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl Default for TokenStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = TokenStateMachine::new();

        // 测试有效转换
        assert!(sm.can_transition(TokenStatus::Waiting, &TokenEvent::Approved));
        assert!(sm.can_transition(TokenStatus::Waiting, &TokenEvent::Rescheduled));
        assert!(sm.can_transition(TokenStatus::InConsultation, &TokenEvent::Finalized));
        assert!(sm.can_transition(TokenStatus::InConsultation, &TokenEvent::Escalated));
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = TokenStateMachine::new();

        // 候诊令牌不能直接完成或转急诊
        assert!(!sm.can_transition(TokenStatus::Waiting, &TokenEvent::Finalized));
        assert!(!sm.can_transition(TokenStatus::Waiting, &TokenEvent::Escalated));
        // 终态不再接受任何事件
        assert!(!sm.can_transition(TokenStatus::Completed, &TokenEvent::Approved));
        assert!(!sm.can_transition(TokenStatus::Escalated, &TokenEvent::Finalized));
    }

    #[test]
    fn test_state_execution() {
        let sm = TokenStateMachine::new();

        let result = sm.transition(TokenStatus::Waiting, &TokenEvent::Approved);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), TokenStatus::InConsultation);

        // 改约保持候诊状态不变
        let result = sm.transition(TokenStatus::Waiting, &TokenEvent::Rescheduled);
        assert_eq!(result.unwrap(), TokenStatus::Waiting);

        let result = sm.transition(TokenStatus::Completed, &TokenEvent::Approved);
        assert!(result.is_err());
    }

    #[test]
    fn test_possible_events() {
        let sm = TokenStateMachine::new();

        let mut events = sm.possible_events(TokenStatus::InConsultation);
        events.sort_by_key(|e| format!("{:?}", e));
        assert_eq!(events, vec![TokenEvent::Escalated, TokenEvent::Finalized]);

        assert!(sm.possible_events(TokenStatus::Completed).is_empty());
    }
}

//! 应急预案开关
//!
//! 单一全局挂起标志：启动后暂停新接诊与叫号，
//! 但不影响在诊患者的完成与转急诊。

use chrono::{DateTime, Utc};

/// 应急预案控制器
///
/// activate/deactivate 均为幂等操作，重复调用不视为错误。
#[derive(Debug, Default)]
pub struct EmergencyProtocol {
    active: bool,
    activated_at: Option<DateTime<Utc>>,
    activated_by: Option<String>,
}

impl EmergencyProtocol {
    /// 创建新的控制器，初始为未启动
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动应急预案，返回本次调用是否改变了状态
    pub fn activate(&mut self, operator: &str) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.activated_at = Some(Utc::now());
        self.activated_by = Some(operator.to_string());

        tracing::warn!("Emergency protocol activated by {}", operator);
        true
    }

    /// 解除应急预案，返回本次调用是否改变了状态
    pub fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.activated_at = None;
        self.activated_by = None;

        tracing::warn!("Emergency protocol deactivated");
        true
    }

    /// 当前是否处于应急状态（纯读取）
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 启动时刻
    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    /// 启动操作者
    pub fn activated_by(&self) -> Option<&str> {
        self.activated_by.as_deref()
    }

    /// 从快照恢复标志位
    pub fn restore(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.activated_at = None;
            self.activated_by = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_inactive() {
        let protocol = EmergencyProtocol::new();
        assert!(!protocol.is_active());
        assert!(protocol.activated_at().is_none());
    }

    #[test]
    fn test_activate_deactivate() {
        let mut protocol = EmergencyProtocol::new();

        assert!(protocol.activate("admin"));
        assert!(protocol.is_active());
        assert_eq!(protocol.activated_by(), Some("admin"));

        assert!(protocol.deactivate());
        assert!(!protocol.is_active());
        assert!(protocol.activated_by().is_none());
    }

    #[test]
    fn test_idempotent_toggling() {
        let mut protocol = EmergencyProtocol::new();

        // 重复启动与单次启动观察结果一致
        assert!(protocol.activate("admin"));
        assert!(!protocol.activate("admin"));
        assert!(protocol.is_active());

        assert!(protocol.deactivate());
        assert!(!protocol.deactivate());
        assert!(!protocol.is_active());
    }
}

//! # 门诊流转模块
//!
//! 提供完整的门诊患者流转协调功能，包括：
//! - 令牌状态机：管理排队令牌的完整生命周期
//! - 令牌登记处：候诊/就诊/转急诊/完成四个分区的原子流转
//! - 问诊计时器：按秒推进会话时长并推导超时信号
//! - 应急预案开关：暂停新接诊但不影响在诊患者
//! - 审计台账：只追加的就诊完成记录
//! - 血液调配板：医院间握手与社区广播双通道请求
//! - 流转引擎：表现层调用的统一门面

pub mod audit;
pub mod blood;
pub mod engine;
pub mod events;
pub mod protocol;
pub mod registry;
pub mod state_machine;
pub mod timer;

// 重新导出主要类型
pub use audit::AuditLog;
pub use blood::BloodRequestBoard;
pub use engine::{spawn_ticker, FlowEngine, FlowOverview, SharedFlowEngine};
pub use events::FlowEvent;
pub use protocol::EmergencyProtocol;
pub use registry::TokenRegistry;
pub use state_machine::{TokenEvent, TokenStateMachine};
pub use timer::{ConsultationTimer, ExpectedDurations, SessionProgress};

//! 错误定义模块

use thiserror::Error;

/// 门诊系统统一错误类型
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("系统内部错误: {0}")]
    Internal(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("应急预案已启动，暂停受理: {0}")]
    OverrideSuspended(String),

    #[error("无效状态: {0}")]
    InvalidState(String),

    #[error("无效状态转换: 从 {from} 经 {event}")]
    InvalidStateTransition { from: String, event: String },
}

/// 门诊系统统一结果类型
pub type Result<T> = std::result::Result<T, ClinicError>;

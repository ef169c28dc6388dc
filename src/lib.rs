//! # Clinic
//!
//! 门诊患者流转协调系统的聚合入口，重新导出各子模块。

pub use clinic_core;
pub use clinic_flow;
pub use clinic_storage;

//! 服务器配置
//!
//! 默认值、可选 TOML 配置文件与 CLINIC_ 环境变量三层叠加。

use clinic_core::{ClinicError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 快照文件路径
    pub snapshot_path: String,
    /// 是否启动按秒滴答任务
    pub tick_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            snapshot_path: "./data/flow-snapshot.json".to_string(),
            tick_enabled: true,
        }
    }
}

impl ServerConfig {
    /// 加载配置：默认值 < 配置文件 < 环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = ServerConfig::default();

        let mut builder = Config::builder()
            .set_default("host", defaults.host.clone())
            .map_err(|e| ClinicError::Config(e.to_string()))?
            .set_default("port", defaults.port as i64)
            .map_err(|e| ClinicError::Config(e.to_string()))?
            .set_default("snapshot_path", defaults.snapshot_path.clone())
            .map_err(|e| ClinicError::Config(e.to_string()))?
            .set_default("tick_enabled", defaults.tick_enabled)
            .map_err(|e| ClinicError::Config(e.to_string()))?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let config = builder
            .add_source(Environment::with_prefix("CLINIC").try_parsing(true))
            .build()
            .map_err(|e| ClinicError::Config(e.to_string()))?;

        let config: ServerConfig = config
            .try_deserialize()
            .map_err(|e| ClinicError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClinicError::Config("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(ClinicError::Config("port must be non-zero".to_string()));
        }
        if self.snapshot_path.trim().is_empty() {
            return Err(ClinicError::Config("snapshot_path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_file() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.tick_enabled);
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

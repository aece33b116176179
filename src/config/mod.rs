use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{ConfigError, ConfigResult};

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub log: LogConfig,
}

/// 查询注册表配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// 插入时未指定 ttl 的查询的存活时间（秒）
    pub default_ttl_secs: u64,
    /// 后台清扫间隔（毫秒）
    pub sweep_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            sweep_interval_ms: 1000,
        }
    }
}

impl RegistryConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "query-registry".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.registry.sweep_interval_ms == 0 {
            return Err(ConfigError::invalid("registry.sweep_interval_ms 必须大于 0"));
        }
        if self.log.file.is_empty() {
            return Err(ConfigError::invalid("log.file 不能为空"));
        }
        if self.log.max_files == 0 {
            return Err(ConfigError::invalid("log.max_files 必须大于 0"));
        }
        Ok(())
    }
}

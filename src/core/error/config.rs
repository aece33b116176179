//! 配置错误类型

use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};

/// 配置操作结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置加载、保存与校验错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置解析失败: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("配置序列化失败: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("无效配置: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

impl ToPublicError for ConfigError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            ConfigError::Parse(_) | ConfigError::Invalid(_) => ErrorCode::InvalidInput,
            ConfigError::Io(_) | ConfigError::Serialize(_) => ErrorCode::InternalError,
        }
    }

    fn to_public_message(&self) -> String {
        self.to_string()
    }
}

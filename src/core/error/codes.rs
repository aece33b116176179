//! 对外错误码
//!
//! 注册表的失败原因以稳定的数字码交给请求层，再由请求层转交客户端。
//! 数字码按百位分组：2xx 并发，3xx 校验，5xx 资源，9xx 系统。

use serde::{Deserialize, Serialize};

/// 对外错误码，数值一经发布不再改动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// 查询正被其他调用方检出
    Conflict = 203,
    /// 配置内容无法解析或取值非法
    InvalidInput = 302,
    /// 条目存在但不处于所需状态
    ConstraintViolation = 303,
    ResourceNotFound = 500,
    ResourceAlreadyExists = 501,
    /// 配置文件读写失败
    InternalError = 900,
}

impl ErrorCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Conflict => "查询正被使用",
            ErrorCode::InvalidInput => "无效输入",
            ErrorCode::ConstraintViolation => "查询状态不符",
            ErrorCode::ResourceNotFound => "查询不存在",
            ErrorCode::ResourceAlreadyExists => "查询已存在",
            ErrorCode::InternalError => "内部错误",
        }
    }

    /// 稍后重试是否可能成功
    ///
    /// 注册表自身从不等待或重试，由调用方决定
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::Conflict)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.default_message())
    }
}

/// 序列化到响应中的错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicError {
    pub code: ErrorCode,
    pub message: String,
}

impl PublicError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// 内部错误到对外错误的转换
pub trait ToPublicError {
    fn to_public_error(&self) -> PublicError {
        PublicError::new(self.to_error_code(), self.to_public_message())
    }

    fn to_error_code(&self) -> ErrorCode;

    fn to_public_message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(ErrorCode::Conflict.is_retryable());
        assert!(!ErrorCode::ResourceNotFound.is_retryable());
        assert!(!ErrorCode::ResourceAlreadyExists.is_retryable());
        assert!(!ErrorCode::ConstraintViolation.is_retryable());
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Conflict.to_string(), "203 (查询正被使用)");
        assert_eq!(ErrorCode::ResourceNotFound.as_i32(), 500);
    }
}

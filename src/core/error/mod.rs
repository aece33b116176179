//! 错误处理
//!
//! - 注册表错误使用枚举设计，每个变体携带出错的 (租户, 查询ID)
//! - 插入失败通过 [`InsertError`] 把查询对象交还给调用方
//! - 所有内部错误都可以通过 [`ToPublicError`] 转换为稳定的对外错误码

pub mod codes;
pub mod config;
pub mod registry;

pub use codes::{ErrorCode, PublicError, ToPublicError};
pub use config::{ConfigError, ConfigResult};
pub use registry::{InsertError, RegistryError, RegistryResult};
